//! Occurrence record counts from the records summary API.

use serde_json::{json, Map, Value};
use tracing::info;

use super::{log_failure, params_json, Services};
use crate::error::Result;
use crate::query::MAX_LIMIT;
use crate::response::ResponseContext;

/// Entrypoint identifier.
pub const ID: &str = "count_occurrence_records";

/// Entrypoint description for the agent card.
pub const DESCRIPTION: &str = "\
Counts the total number of records in iDigBio matching the user's search criteria. Also breaks the count down by a \
specified field (default: scientific name) to build top-N lists or to find unique record field values that were \
matched. Counts can be broken down by any of iDigBio's query fields, such as \"country\" or \"collector\". Does NOT count \
the total number of unique values that were matched.

Here are some examples of building top-N lists:
- List the 10 species that have the most records in a country
- List the 5 countries that have the most records of a species
- List the 3 collectors who have recorded the most occurrences of a species

Here are some examples of finding unique values in matching records:
- List the continents that a species occurs in
- List different scientific names that have the same genus and specific epithet (e.g., scientific names with \
different authors)

Also returns the URL used to collect records counts from the iDigBio Summary API.";

/// Entries shown in the preview table when no count was requested.
const DEFAULT_COUNT_TO_SHOW: usize = 10;

/// Largest preview table.
const MAX_COUNT_TO_SHOW: usize = 25;

/// Number of preview rows for a requested count.
fn preview_count(count: Option<u32>) -> usize {
    match count {
        None => DEFAULT_COUNT_TO_SHOW,
        Some(0) => MAX_COUNT_TO_SHOW,
        Some(n) => usize::try_from(n).map_or(MAX_COUNT_TO_SHOW, |n| n.min(MAX_COUNT_TO_SHOW)),
    }
}

/// The per-value counts in a summary response.
///
/// Keyed by the requested field when present, otherwise by the first key
/// that is not `itemCount`.
fn top_counts<'a>(body: &'a Value, top_fields: &str) -> Option<&'a Map<String, Value>> {
    let body = body.as_object()?;
    body.get(top_fields)
        .or_else(|| {
            body.iter()
                .find(|(key, _)| key.as_str() != "itemCount")
                .map(|(_, value)| value)
        })
        .and_then(Value::as_object)
}

/// `{value: itemCount}` for the first `limit` entries.
fn counts_table(counts: &Map<String, Value>, limit: usize) -> Map<String, Value> {
    counts
        .iter()
        .take(limit)
        .map(|(key, value)| {
            let count = value.get("itemCount").cloned().unwrap_or(Value::Null);
            (key.clone(), count)
        })
        .collect()
}

/// Count records matching `request`.
///
/// # Errors
///
/// Returns [`Error::ResponseClosed`](crate::Error::ResponseClosed) if the
/// response receiver went away. Other failures are reported on the response.
pub async fn run(services: Services<'_>, context: &ResponseContext, request: &str) -> Result<()> {
    let process = context.begin_process("Requesting iDigBio statistics").await?;

    process
        .log("Generating search parameters for species occurrences")
        .await?;
    let plan = match services.translator.summary(request).await {
        Ok(plan) => plan,
        Err(err) => return log_failure(&process, err).await,
    };

    let params = plan.search_parameters;
    let top_fields = params.top_fields.clone();
    let json_params = params_json(&params)?;
    process
        .log_data("Generated search parameters", json_params.clone())
        .await?;

    let summary_url = services.urls.summary_url(&json_params);
    process
        .log(format!(
            "Sending a GET request to the iDigBio records summary API at {summary_url}"
        ))
        .await?;

    let response = match services.api.summary(&summary_url).await {
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
    process
        .log(format!("Response code: {}", response.status_line))
        .await?;

    let body = response.body.clone().unwrap_or(Value::Null);
    let total_record_count = response.item_count();
    let counts = top_counts(&body, &top_fields);
    let total_unique_count = counts.map_or(0, Map::len);
    info!(total_record_count, total_unique_count, %top_fields, "records summary finished");

    context
        .reply(format!(
            "The API query found {total_unique_count} unique \"{top_fields}\" values across {total_record_count} \
             matching records in iDigBio"
        ))
        .await?;
    process
        .log(format!(
            "[View summary of {total_unique_count} unique \"{top_fields}\" values across {total_record_count} \
             records]({summary_url})"
        ))
        .await?;

    if total_record_count == 0 {
        return Ok(());
    }

    if total_unique_count >= MAX_LIMIT as usize {
        context
            .reply(format!(
                "Warning: Maximum count reached! iDigBio's Summary API can not return more than {MAX_LIMIT} unique \
                 values. There are probably more than that. Consider narrowing your search parameters if you need \
                 exact counts."
            ))
            .await?;
    }

    let preview = preview_count(params.count);
    let table = counts.map(|counts| counts_table(counts, preview)).unwrap_or_default();
    process
        .log_data(
            format!(
                "Record counts for the top {preview} out of {total_unique_count} unique \"{top_fields}\" values"
            ),
            json!({ "__table": table }),
        )
        .await?;
    process
        .create_artifact(
            "application/json",
            Some(plan.artifact_description),
            vec![summary_url],
            json!({
                "data_source": "iDigBio",
                "total_record_count": total_record_count,
                "total_unique_count": total_unique_count,
            }),
        )
        .await?;

    Ok(())
}
