//! System prompts for the language model translator.
//!
//! Each prompt is a prelude describing the iDigBio query format followed by
//! worked examples. Example responses are serialized plan objects, so they
//! always match the schema the model is asked to produce.

use serde::Serialize;

use crate::query::{
    Existence, MediaQuery, MediaSearchParams, MediaType, RecordQuery, RecordsSearchParams,
    StringTerm, SummaryParams, MAX_LIMIT,
};
use crate::translate::{MediaPlan, RecordsPlan, SummaryPlan};

/// How iDigBio record queries are written.
pub const RECORDS_QUERY_FORMAT: &str = include_str!("../resources/records_query_format.md");

/// Worked `rq` examples.
pub const OCCURRENCE_RECORDS_EXAMPLES: &str =
    include_str!("../resources/occurrence_records_examples.md");

/// Worked `mq`/`rq` examples, including the prefer-`mq` convention.
pub const MEDIA_QUERY_EXAMPLES: &str = include_str!("../resources/media_query_examples.md");

const LIST_TIP: &str = "\
- Searching by lists performs an OR operation. For example, a search for \"genus\":[\"Ursus\",\"Puffinus\"] \
will return Ursus records and ALSO Puffinus records, it will NOT return co-occurrences of Ursus and Puffinus.";

/// Join a prelude and numbered examples into a system prompt.
///
/// Each example renders as `# Example {i}`, the user request, and the
/// expected JSON response.
pub fn make_system_prompt<T: Serialize>(prelude: &str, examples: &[(&str, T)]) -> String {
    let examples = examples
        .iter()
        .enumerate()
        .map(|(i, (request, response))| {
            let response = serde_json::to_string(response).unwrap_or_default();
            format!("# Example {i}\n\nUser: {request}\n\nYou: {response}")
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{prelude}{}", examples.trim())
}

fn query_format_section() -> String {
    format!(
        "# Query format\n\n\
         Here is a description of how iDigBio queries are formatted:\n\n\
         [BEGIN QUERY FORMAT DOC]\n\n{}\n\n[END QUERY FORMAT DOC]",
        RECORDS_QUERY_FORMAT.trim()
    )
}

fn species(genus: &str, epithet: &str) -> RecordQuery {
    RecordQuery {
        genus: Some(StringTerm::from(genus)),
        specificepithet: Some(StringTerm::from(epithet)),
        ..Default::default()
    }
}

/// System prompt for `find_occurrence_records`.
#[must_use]
pub fn records_prompt() -> String {
    let prelude = format!(
        "You translate user requests into parameters for the iDigBio record search API.\n\n\
         {}\n\n\
         # Tips\n\n\
         {LIST_TIP}\n\n\
         - The iDigBio API can NOT perform searches that relate records to each other. For example, it \
         cannot retrieve records that are near other records unless the locations of those records can \
         be specified as search parameters.\n\n",
        query_format_section()
    );

    let examples: Vec<(&str, RecordsPlan)> = vec![
        (
            "Homo sapiens",
            RecordsPlan::search(
                "The name Homo sapiens doesn't have authority specified, so I will search by genus and \
                 specificepithet instead of scientificname",
                RecordsSearchParams::new(species("Homo", "sapiens")),
                "Occurrence records for the species Homo sapiens",
            ),
        ),
        (
            "Only Homo sapiens Linnaeus, 1758",
            RecordsPlan::search(
                "The name includes authority information, so I will search by scientificname",
                RecordsSearchParams::new(RecordQuery {
                    scientificname: Some(StringTerm::from("Homo sapiens Linnaeus, 1758")),
                    ..Default::default()
                }),
                "Occurrence records for the species \"Homo sapiens Linnaeus, 1758\"",
            ),
        ),
        (
            "Scientific name \"this is fake but use it anyway\"",
            RecordsPlan::search(
                "The request placed a scientific name in quotes, so I will search by scientificname for an \
                 exact match",
                RecordsSearchParams::new(RecordQuery {
                    scientificname: Some(StringTerm::from("this is fake but use it anyway")),
                    ..Default::default()
                }),
                "Occurrence records for the species \"this is fake but use it anyway\"",
            ),
        ),
        (
            "kingdom must be specified",
            RecordsPlan::search(
                "To find records that have the kingdom field, I need to search by kingdom for \
                 {\"type\": \"exists\"}",
                RecordsSearchParams::new(RecordQuery {
                    kingdom: Some(Existence::exists().into()),
                    ..Default::default()
                }),
                "Occurrence records with the kingdom field specified",
            ),
        ),
        (
            "Records with no collector specified",
            RecordsPlan::search(
                "To find records with no collector field, I need to search by collector for \
                 {\"type\": \"missing\"}",
                RecordsSearchParams::new(RecordQuery {
                    collector: Some(Existence::missing().into()),
                    ..Default::default()
                }),
                "Occurrence records with no collector specified",
            ),
        ),
        (
            "Homo sapiens and Rattus rattus in North America and Australia",
            RecordsPlan::search(
                "The request concerns two species in two continents, so I will search using the \
                 scientificname and continent fields, specifying the values using list syntax.",
                RecordsSearchParams::new(RecordQuery {
                    scientificname: Some(StringTerm::AnyOf(vec![
                        "Homo sapiens".to_string(),
                        "Rattus rattus".to_string(),
                    ])),
                    continent: Some(StringTerm::AnyOf(vec![
                        "North America".to_string(),
                        "Australia".to_string(),
                    ])),
                    ..Default::default()
                }),
                "Occurrence records of Homo sapiens and Rattus rattus in North America and Australia",
            ),
        ),
        (
            "Rattus rattus occurrences near Naja naja occurrences",
            RecordsPlan::abort(
                "The iDigBio API cannot relate records to each other, so I cannot search for records \
                 near other records. I should abort.",
            ),
        ),
    ];

    make_system_prompt(&prelude, &examples)
}

/// System prompt for `find_media_records`.
#[must_use]
pub fn media_prompt() -> String {
    let prelude = format!(
        "You translate user requests into parameters for the iDigBio media search API.\n\n\
         {}\n\n\
         # Media query conventions\n\n{}\n\n\
         # Tips\n\n\
         {LIST_TIP}\n\n\
         - Do not choose search parameters that only partially fulfill the user's request. Instead, you \
         should abort (don't set any search parameters) and explain why.\n\n",
        query_format_section(),
        MEDIA_QUERY_EXAMPLES.trim()
    );

    let examples: Vec<(&str, MediaPlan)> = vec![
        (
            "Homo sapiens",
            MediaPlan::search(
                "The request only specifies occurrence-related information, I will search using rq fields. \
                 The name doesn't have authority specified, so I will search by genus and specificepithet \
                 instead of scientificname",
                MediaSearchParams {
                    rq: Some(species("Homo", "sapiens")),
                    ..Default::default()
                },
                "Media records for the species Homo sapiens",
            ),
        ),
        (
            "Audio of Homo sapiens",
            MediaPlan::search(
                "To filter for audio media I need to use the mq field and search by mediatype. The mediatype \
                 for audio is \"sounds\". The request doesn't specify an authority for the name Homo sapiens, \
                 so I will search by genus and specificepithet instead of scientificname",
                MediaSearchParams {
                    mq: Some(MediaQuery::of_type(MediaType::Sounds)),
                    rq: Some(species("Homo", "sapiens")),
                    limit: None,
                },
                "Audio media records for the species Homo sapiens",
            ),
        ),
        (
            "Pictures of Rattus rattus in Taiwan",
            MediaPlan::search(
                "To filter for picture media I need to use the mq field and search by mediatype. The \
                 mediatype for pictures is \"images\". To filter by species and country, I need to use the \
                 rq field. The request doesn't specify an authority for the name Rattus rattus, so I will \
                 search by genus and specificepithet instead of scientificname",
                MediaSearchParams {
                    mq: Some(MediaQuery::of_type(MediaType::Images)),
                    rq: Some(RecordQuery {
                        country: Some(StringTerm::from("Taiwan")),
                        ..species("Rattus", "rattus")
                    }),
                    limit: None,
                },
                "Images of Rattus rattus in Taiwan",
            ),
        ),
        (
            "Blurry images in Canada",
            MediaPlan::abort("There are no search parameters for image quality, so I should abort."),
        ),
        (
            "Images of blue plants",
            MediaPlan::abort(
                "There are no search parameters for color or other image features, so I should abort.",
            ),
        ),
    ];

    make_system_prompt(&prelude, &examples)
}

/// System prompt for `count_occurrence_records`.
#[must_use]
pub fn summary_prompt() -> String {
    let prelude = format!(
        "You translate user requests into parameters for the iDigBio records summary API.\n\n\
         {}\n\n\
         # General rq object examples\n\n{}\n\n\
         # Tips\n\n\
         - top_fields names the single field to break record counts down by. It defaults to \
         \"scientificname\".\n\n\
         - To count unique values (for example, the number of species), set count to the maximum, \
         {MAX_LIMIT}.\n\n",
        query_format_section(),
        OCCURRENCE_RECORDS_EXAMPLES.trim()
    );

    let examples: Vec<(&str, SummaryPlan)> = vec![
        (
            "Count number of species of Aves",
            SummaryPlan {
                plan: "To count species I break counts down by scientificname, restrict the records to \
                       species-level names, and use the maximum count"
                    .to_string(),
                search_parameters: SummaryParams {
                    top_fields: "scientificname".to_string(),
                    count: Some(MAX_LIMIT),
                    rq: Some(RecordQuery {
                        class_: Some(StringTerm::from("Aves")),
                        taxonrank: Some(StringTerm::from("species")),
                        ..Default::default()
                    }),
                },
                artifact_description: "Per-species record counts for class Aves".to_string(),
            },
        ),
        (
            "Find countries with Rattus rattus",
            SummaryPlan {
                plan: "To list countries I break counts down by country. The name has no authority, so I \
                       search by genus and specificepithet"
                    .to_string(),
                search_parameters: SummaryParams {
                    top_fields: "country".to_string(),
                    count: Some(MAX_LIMIT),
                    rq: Some(species("Rattus", "rattus")),
                },
                artifact_description: "Per-country record counts for species Rattus rattus".to_string(),
            },
        ),
        (
            "Top 3 collectors of Puma concolor",
            SummaryPlan {
                plan: "To rank collectors I break counts down by collector and show the top 3".to_string(),
                search_parameters: SummaryParams {
                    top_fields: "collector".to_string(),
                    count: Some(3),
                    rq: Some(species("Puma", "concolor")),
                },
                artifact_description: "Per-collector record counts for species Puma concolor".to_string(),
            },
        ),
    ];

    make_system_prompt(&prelude, &examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_make_system_prompt_format() {
        let examples = [("first", json!({"a": 1})), ("second", json!({"b": "x"}))];
        let prompt = make_system_prompt("Prelude\n\n", &examples);
        assert_eq!(
            prompt,
            "Prelude\n\n# Example 0\n\nUser: first\n\nYou: {\"a\":1}\n\n# Example 1\n\nUser: second\n\nYou: {\"b\":\"x\"}"
        );
    }

    #[test]
    fn test_make_system_prompt_without_examples() {
        let examples: [(&str, serde_json::Value); 0] = [];
        assert_eq!(make_system_prompt("Only prelude", &examples), "Only prelude");
    }

    #[test]
    fn test_media_prompt_contains_audio_example() {
        let prompt = media_prompt();
        assert!(prompt.contains("User: Audio of Homo sapiens"));
        assert!(prompt.contains(
            r#""search_parameters":{"mq":{"mediatype":"sounds"},"rq":{"genus":"Homo","specificepithet":"sapiens"}}"#
        ));
        assert!(prompt.contains("Prefer populating `mq`"));
    }

    #[test]
    fn test_examples_omit_unset_fields() {
        let prompt = media_prompt();
        assert!(!prompt.contains("null"));
        assert!(prompt.contains(
            r#"You: {"plan":"There are no search parameters for image quality, so I should abort.","search_parameters_fully_match_the_request":false}"#
        ));
    }

    #[test]
    fn test_records_prompt_contents() {
        let prompt = records_prompt();
        assert!(prompt.starts_with("You translate user requests into parameters for the iDigBio record search API."));
        assert!(prompt.contains("[BEGIN QUERY FORMAT DOC]"));
        assert!(prompt.contains(r#"{"collector":{"type":"missing"}}"#));
        assert!(prompt.contains("# Example 6"));
    }

    #[test]
    fn test_summary_prompt_contents() {
        let prompt = summary_prompt();
        assert!(prompt.contains("records summary API"));
        assert!(prompt.contains(r#""top_fields":"scientificname","count":5000"#));
        assert!(prompt.contains("# General rq object examples"));
    }
}
