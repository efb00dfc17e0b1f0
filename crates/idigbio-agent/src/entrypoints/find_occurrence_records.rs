//! Occurrence records search.

use serde_json::json;
use tracing::info;

use super::{log_failure, params_json, Services};
use crate::error::Result;
use crate::response::ResponseContext;
use crate::urls::RECORDS_ENDPOINT;

/// Entrypoint identifier.
pub const ID: &str = "find_occurrence_records";

/// Entrypoint description for the agent card.
pub const DESCRIPTION: &str = "\
Searches for species occurrence records using the iDigBio Portal or the iDigBio records API. Returns the total number \
of records that were found, the URL used to call the iDigBio Records API to perform the search, and a URL to view the \
results in the iDigBio Search Portal.";

/// Search occurrence records matching `request`.
///
/// # Errors
///
/// Returns [`Error::ResponseClosed`](crate::Error::ResponseClosed) if the
/// response receiver went away. Other failures are reported on the response.
pub async fn run(services: Services<'_>, context: &ResponseContext, request: &str) -> Result<()> {
    let process = context
        .begin_process("Searching iDigBio occurrence records")
        .await?;

    process
        .log("Generating search parameters for iDigBio's occurrence records API")
        .await?;
    let plan = match services.translator.records(request).await {
        Ok(plan) => plan,
        Err(err) => return log_failure(&process, err).await,
    };

    let Some(params) = plan.search_parameters else {
        return process
            .log(format!(
                "Failed to generate appropriate search parameters. Reason: {}",
                plan.plan
            ))
            .await;
    };

    let json_params = params_json(&params)?;
    process
        .log_data("Generated search parameters", json_params.clone())
        .await?;

    let api_query_url = services.urls.api_url(RECORDS_ENDPOINT, Some(&json_params));
    process
        .log(format!(
            "Sending a POST request to the iDigBio occurrence records API at {api_query_url}"
        ))
        .await?;

    let response = match services.api.search(RECORDS_ENDPOINT, &json_params).await {
        Ok(response) => response,
        Err(err) => return log_failure(&process, err).await,
    };
    if !response.ok {
        return process
            .log(format!(
                "Response code: {} - something went wrong!",
                response.status_line
            ))
            .await;
    }

    let matching_count = response.item_count();
    let record_count = response.items_len();
    info!(record_count, matching_count, "occurrence records search finished");

    context
        .reply(format!(
            "The API query returned {record_count} out of {matching_count} matching records in iDigBio using the URL \
             {api_query_url}"
        ))
        .await?;

    let portal_url = services.urls.portal_url(Some(&json_params));
    process
        .log(format!(
            "[View {record_count} out of {matching_count} matching records]({api_query_url}) | \
             [Show in iDigBio portal]({portal_url})"
        ))
        .await?;

    if record_count > 0 {
        context
            .reply(format!(
                "The records can be viewed in the iDigBio portal at {portal_url}. The portal shows the records in an \
                 interactive list and plots them on a map. The raw records returned by the API can be found at \
                 {api_query_url}"
            ))
            .await?;
        process
            .create_artifact(
                "application/json",
                plan.artifact_description,
                vec![api_query_url],
                json!({
                    "data_source": "iDigBio",
                    "portal_url": portal_url,
                    "retrieved_record_count": record_count,
                    "total_matching_count": matching_count,
                }),
            )
            .await?;
    }

    Ok(())
}
