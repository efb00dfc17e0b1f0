//! Media records search.

use serde_json::json;
use tracing::info;

use super::{log_failure, params_json, Services};
use crate::error::Result;
use crate::response::ResponseContext;
use crate::urls::MEDIA_ENDPOINT;

/// Entrypoint identifier.
pub const ID: &str = "find_media_records";

/// Entrypoint description for the agent card.
pub const DESCRIPTION: &str = "\
Searches iDigBio for media records (like images and audio). Returns the total number of media records that were found, \
a URL to access the raw results returned by the iDigBio media API, and a URL to view the results in the iDigBio Search \
Portal. Also displays an interactive media gallery to the user.";

/// Search media records matching `request`.
///
/// # Errors
///
/// Returns [`Error::ResponseClosed`](crate::Error::ResponseClosed) if the
/// response receiver went away. Other failures are reported on the response.
pub async fn run(services: Services<'_>, context: &ResponseContext, request: &str) -> Result<()> {
    let process = context.begin_process("Searching iDigBio media records").await?;

    process
        .log("Generating search parameters for the iDigBio's media records API")
        .await?;
    let plan = match services.translator.media(request).await {
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

    let api_query_url = services.urls.api_url(MEDIA_ENDPOINT, Some(&json_params));
    process
        .log(format!(
            "Sending a POST request to the iDigBio media records API at {api_query_url}"
        ))
        .await?;

    let response = match services.api.search(MEDIA_ENDPOINT, &json_params).await {
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
    info!(record_count, matching_count, "media records search finished");

    context
        .reply(format!(
            "The API query returned {record_count} out of {matching_count} matching media records in iDigBio using \
             the URL {api_query_url}"
        ))
        .await?;

    if record_count > 0 {
        process
            .create_artifact(
                "application/json",
                plan.artifact_description,
                vec![api_query_url],
                json!({
                    "data_source": "iDigBio",
                    "retrieved_record_count": record_count,
                    "total_matching_count": matching_count,
                }),
            )
            .await?;
        context.reply(tips(services)).await?;
    }

    Ok(())
}

fn tips(services: Services<'_>) -> String {
    format!(
        "Tips:\n\
         - Image URLs can be found in the artifact record data at items[].indexTerms.accessuri\n\
         - UUIDs for associated specimen/occurrence records in iDigBio are found in the artifact record data at \
         items[].indexTerms.records\n\
         - The web pages for individual media records follow the pattern {} using the UUIDs found in the artifact \
         record data at items[].uuid.",
        services.urls.media_record_page("[UUID]")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entrypoints::testing::{artifacts, drain, texts, FakeIDigBio};
    use crate::idigbio::ApiResponse;
    use crate::response::AgentMessage;
    use crate::translate::RuleTranslator;
    use crate::urls::IDigBioUrls;

    async fn run_with(api: &FakeIDigBio, request: &str) -> Vec<AgentMessage> {
        crate::logging::init_test_logging();
        let urls = IDigBioUrls::default();
        let services = Services {
            translator: &RuleTranslator,
            api,
            urls: &urls,
        };
        let (context, rx) = ResponseContext::channel(64);
        run(services, &context, request).await.unwrap();
        drain(context, rx).await
    }

    #[tokio::test]
    async fn test_audio_of_homo_sapiens() {
        let api = FakeIDigBio::new(ApiResponse::success(json!({
            "itemCount": 12,
            "items": [{"uuid": "m1"}]
        })));
        let messages = run_with(&api, "Audio of homo sapiens").await;

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0].0, MEDIA_ENDPOINT);
        assert_eq!(
            calls[0].1,
            json!({
                "mq": {"mediatype": "sounds"},
                "rq": {"genus": "Homo", "specificepithet": "sapiens"}
            })
        );

        let texts = texts(&messages);
        assert!(texts.iter().any(|text| text.starts_with(
            "Sending a POST request to the iDigBio media records API at \
             https://search.idigbio.org/v2/search/media?mq=%7B%22mediatype%22:%22sounds%22%7D&rq="
        )));
        assert!(texts
            .iter()
            .any(|text| text.starts_with("The API query returned 1 out of 12 matching media records")));

        let tips = texts.last().unwrap();
        assert!(tips.starts_with("Tips:\n"));
        assert!(tips.contains("https://portal.idigbio.org/portal/mediarecords/[UUID]"));

        let artifacts = artifacts(&messages);
        assert_eq!(artifacts.len(), 1);
        let AgentMessage::Artifact { metadata, .. } = artifacts[0] else {
            unreachable!()
        };
        assert_eq!(
            *metadata,
            json!({"data_source": "iDigBio", "retrieved_record_count": 1, "total_matching_count": 12})
        );
    }

    #[tokio::test]
    async fn test_media_without_taxonomy_sends_only_mq() {
        let api = FakeIDigBio::new(ApiResponse::success(json!({"itemCount": 0, "items": []})));
        run_with(&api, "Sound recordings").await;

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0].1, json!({"mq": {"mediatype": "sounds"}}));
    }

    #[tokio::test]
    async fn test_unsupported_request_produces_no_artifact() {
        let api = FakeIDigBio::new(ApiResponse::success(json!({})));
        let messages = run_with(&api, "Find pictures of blue butterflies").await;

        assert!(api.calls.lock().unwrap().is_empty());
        assert!(artifacts(&messages).is_empty());
        let last = texts(&messages).pop().unwrap();
        assert_eq!(
            last,
            "Failed to generate appropriate search parameters. Reason: There are no search parameters for color or \
             other image features, so I should abort."
        );
    }
}
