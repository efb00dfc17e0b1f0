//! Deterministic request parsing.
//!
//! Recognizes a fixed vocabulary: taxon names, quoted and authored names,
//! rank phrases, common group names ("birds"), places, years, media words,
//! existence phrases and summary groupings. Anything outside that vocabulary
//! makes the plan abort with a reason, so a request is never answered with
//! parameters that only partially match it.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{MediaPlan, RecordsPlan, SummaryPlan, Translator};
use crate::error::{Error, Result};
use crate::query::{
    capitalize, Existence, MediaQuery, MediaSearchParams, MediaType, RecordQuery,
    RecordsSearchParams, SummaryParams, Validate, DEFAULT_RECORDS_LIMIT, DEFAULT_SUMMARY_COUNT,
    DEFAULT_TOP_FIELD, MAX_LIMIT,
};

const SEP: &str = " , ";

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex pattern")
}

static QUOTED: LazyLock<Regex> = LazyLock::new(|| regex(r#""([^"]+)""#));
static AUTHORED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b([A-Z][a-z]+\s+[a-z]+(?:\s+[a-z]+)?)\s+(\(?[A-Z][A-Za-z.'\-]*(?:\s+(?:&|and|et|ex)\s+[A-Z][A-Za-z.'\-]*)*,?\s+\d{4}\)?)")
});
static COLLECTED_BY: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i:collected|recorded|observed|gathered)\s+(?i:by)\s+([A-Z][\w.'\-]*(?:\s+[A-Z][\w.'\-]*)*)")
});
static MISSING: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:with\s+no|without|missing|lacking|no)\s+(?:an?\s+|the\s+|any\s+)?([a-z]+(?:\s+names?)?)(?:\s+(?:specified|field|value|information|recorded|given))?\b")
});
static EXISTS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:with\s+(?:an?\s+|the\s+)?)?([a-z]+(?:\s+names?)?)\s+(?:field\s+)?(?:must\s+be\s+|is\s+|being\s+)?(?:specified|present|recorded|known|given)\b")
});
static GROUP_BY: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:broken\s+down\s+by|grouped\s+by|for\s+each|by|per|each)\s+([a-z]+(?:\s+names?)?)\b")
});
static RANK: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(kingdom|phylum|class|order|family|genus)\s+([a-z]+)\b"));
static YEAR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(?:between|from)\s+(\d{4})\s+(?:and|to|-|until)\s+(\d{4})\b"));
static CENTURY: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(?:in|during)?\s*(?:the\s+)?(\d{2})00s\b"));
static YEAR_BOUND: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(before|after|since|until)\s+(\d{4})\b"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b(?:in|during)\s+(\d{4})\b"));
static LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:first|top|limit(?:ed)?(?:\s+to)?|up\s+to|at\s+most)\s+(\d{1,6})\b")
});
static PLACE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(?:[Ii]n|[Ff]rom)\s+(?:the\s+)?([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*(?:\s*(?:,|\band\b|\bor\b)\s*(?:the\s+)?[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)*)")
});
static PLACE_SPLIT: LazyLock<Regex> = LazyLock::new(|| regex(r"\s*(?:,|\band\b|\bor\b)\s*"));
static TOKEN: LazyLock<Regex> = LazyLock::new(|| regex(r"\p{L}[\p{L}'\-]*|\d+|\S"));

const STOPWORDS: &[&str] = &[
    "a", "about", "all", "also", "an", "and", "any", "are", "associated", "at", "be", "been",
    "being", "belong", "belonging", "belongs", "by", "called", "can", "collected", "could",
    "count", "counts", "data", "did", "different", "display", "distinct", "do", "does", "each",
    "every", "exist", "exists", "fetch", "find", "first", "for", "found", "from", "get", "give",
    "had", "has", "have", "how", "i", "idigbio", "in", "is", "its", "just", "kind", "kinds",
    "least", "like", "list", "many", "me", "media", "most", "much", "multimedia", "name", "named",
    "need", "number", "numbers", "observation", "observations", "occur", "occurrence",
    "occurrences", "occurring", "occurs", "of", "on", "only", "or", "per", "please", "portal",
    "record", "records", "related", "retrieve", "return", "scientific", "search", "show", "some",
    "species", "specimen", "specimens", "taxa", "taxon", "that", "the", "their", "there", "these",
    "this", "those", "to", "top", "total", "type", "types", "unique", "us", "want", "was", "we",
    "were", "what", "where", "which", "who", "whose", "with", "would", "you",
];

const PROXIMITY_WORDS: &[&str] = &[
    "near", "nearby", "close", "closest", "around", "adjacent", "proximity", "surrounding",
];

const COLOR_WORDS: &[&str] = &[
    "red", "orange", "yellow", "green", "blue", "purple", "violet", "pink", "brown", "black",
    "white", "gray", "grey", "colorful", "colourful", "colored", "coloured", "color", "colour",
];

const QUALITY_WORDS: &[&str] = &[
    "blurry", "blurred", "sharp", "crisp", "pixelated", "grainy", "quality", "resolution",
    "focus", "focused", "hd", "beautiful", "pretty",
];

const NEGATION_WORDS: &[&str] = &["not", "no", "except", "excluding", "exclude", "without", "other"];

const IMAGE_WORDS: &[&str] = &[
    "image", "images", "imagery", "picture", "pictures", "photo", "photos", "photograph",
    "photographs",
];

const SOUND_WORDS: &[&str] = &[
    "audio", "sound", "sounds", "recording", "recordings", "call", "calls", "song", "songs",
    "vocalization", "vocalizations",
];

/// Common names for higher taxa: (word, field, value).
const GROUPS: &[(&str, &str, &str)] = &[
    ("bird", "class", "Aves"),
    ("birds", "class", "Aves"),
    ("mammal", "class", "Mammalia"),
    ("mammals", "class", "Mammalia"),
    ("reptile", "class", "Reptilia"),
    ("reptiles", "class", "Reptilia"),
    ("amphibian", "class", "Amphibia"),
    ("amphibians", "class", "Amphibia"),
    ("insect", "class", "Insecta"),
    ("insects", "class", "Insecta"),
    ("arachnid", "class", "Arachnida"),
    ("arachnids", "class", "Arachnida"),
    ("plant", "kingdom", "Plantae"),
    ("plants", "kingdom", "Plantae"),
    ("fungus", "kingdom", "Fungi"),
    ("fungi", "kingdom", "Fungi"),
    ("animal", "kingdom", "Animalia"),
    ("animals", "kingdom", "Animalia"),
    ("butterfly", "order", "Lepidoptera"),
    ("butterflies", "order", "Lepidoptera"),
    ("moth", "order", "Lepidoptera"),
    ("moths", "order", "Lepidoptera"),
    ("beetle", "order", "Coleoptera"),
    ("beetles", "order", "Coleoptera"),
    ("frog", "order", "Anura"),
    ("frogs", "order", "Anura"),
    ("bat", "order", "Chiroptera"),
    ("bats", "order", "Chiroptera"),
    ("rodent", "order", "Rodentia"),
    ("rodents", "order", "Rodentia"),
    ("spider", "order", "Araneae"),
    ("spiders", "order", "Araneae"),
    ("orchid", "family", "Orchidaceae"),
    ("orchids", "family", "Orchidaceae"),
    ("ant", "family", "Formicidae"),
    ("ants", "family", "Formicidae"),
];

const CONTINENTS: &[&str] = &[
    "Africa",
    "Antarctica",
    "Asia",
    "Australia",
    "Europe",
    "North America",
    "Oceania",
    "South America",
];

const KINGDOMS: &[&str] = &["animalia", "plantae", "fungi", "chromista", "protozoa", "bacteria", "archaea"];

const PHYLA: &[&str] = &[
    "chordata", "arthropoda", "mollusca", "annelida", "cnidaria", "echinodermata", "porifera",
    "nematoda", "platyhelminthes", "tracheophyta", "bryophyta", "ascomycota", "basidiomycota",
];

const CLASSES: &[&str] = &[
    "aves", "mammalia", "reptilia", "amphibia", "insecta", "arachnida", "actinopterygii",
    "chondrichthyes", "gastropoda", "bivalvia", "malacostraca", "magnoliopsida", "liliopsida",
    "polypodiopsida", "pinopsida",
];

/// Rank of a single capitalized taxon name.
fn infer_rank(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if KINGDOMS.contains(&lower.as_str()) {
        "kingdom"
    } else if PHYLA.contains(&lower.as_str()) || lower.ends_with("phyta") || lower.ends_with("mycota") {
        "phylum"
    } else if CLASSES.contains(&lower.as_str()) || lower.ends_with("opsida") || lower.ends_with("phyceae") {
        "class"
    } else if lower.ends_with("iformes") || lower.ends_with("ales") {
        "order"
    } else if lower.ends_with("idae") || lower.ends_with("aceae") {
        "family"
    } else {
        "genus"
    }
}

/// Record query field named by a word or short phrase, singular or plural.
fn field_alias(word: &str) -> Option<&'static str> {
    let word = word.trim().to_lowercase();
    let field = match word.as_str() {
        "collector" | "collectors" => "collector",
        "country" | "countries" => "country",
        "continent" | "continents" => "continent",
        "locality" | "localities" | "location" | "locations" => "locality",
        "family" | "families" => "family",
        "genus" | "genera" => "genus",
        "order" | "orders" => "order",
        "class" | "classes" => "class",
        "phylum" | "phyla" => "phylum",
        "kingdom" | "kingdoms" => "kingdom",
        "institution" | "institutions" => "institutioncode",
        "collection" | "collections" => "collectioncode",
        "state" | "states" | "province" | "provinces" => "stateprovince",
        "county" | "counties" => "county",
        "municipality" | "municipalities" | "city" | "cities" => "municipality",
        "common name" | "common names" => "commonname",
        "scientific name" | "scientific names" | "names" => "scientificname",
        "date" | "dates" => "datecollected",
        "waterbody" | "waterbodies" => "waterbody",
        "recordset" | "recordsets" | "dataset" | "datasets" => "recordset",
        other => return RecordQuery::FIELD_NAMES.iter().find(|f| f.eq_ignore_ascii_case(other)).copied(),
    };
    Some(field)
}

const GENUS_ENDINGS: &[&str] = &[
    "us", "a", "o", "um", "is", "on", "es", "ex", "ix", "yx", "ops", "ys", "x",
];

const EPITHET_ENDINGS: &[&str] = &["us", "um", "a", "is", "ae", "i", "ens", "ans", "or", "x", "e"];

/// Whether a run of two or three words reads as a binomial or trinomial.
///
/// The first word must be capitalized or end like a Latin genus, and every
/// later word must end like a Latin epithet. English plurals ("house cats",
/// "tall trees") fail the epithet test.
fn looks_like_name(run: &[String]) -> bool {
    let Some((genus, epithets)) = run.split_first() else {
        return false;
    };
    let ends_with_any = |word: &str, endings: &[&str]| {
        let lower = word.to_lowercase();
        endings.iter().any(|ending| lower.ends_with(ending))
    };
    let genus_ok = genus.starts_with(char::is_uppercase) || ends_with_any(genus, GENUS_ENDINGS);
    genus_ok
        && !epithets.is_empty()
        && epithets.iter().all(|word| ends_with_any(word, EPITHET_ENDINGS))
}

fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

fn year_end(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// Which entrypoint a request is being parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Records,
    Media,
    Summary,
}

/// Criteria collected from a request.
#[derive(Debug, Default)]
struct Criteria {
    rq: Map<String, Value>,
    mediatype: Option<MediaType>,
    limit: Option<u32>,
    top_field: Option<&'static str>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    notes: Vec<String>,
}

/// Parsed criteria, or the reason for giving up.
type Outcome = std::result::Result<Criteria, String>;

impl Criteria {
    fn add(&mut self, field: &str, value: Value) {
        match self.rq.get_mut(field) {
            None => {
                self.rq.insert(field.to_string(), value);
            }
            Some(Value::Array(items)) => {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            Some(existing) => {
                if *existing != value {
                    let previous = existing.take();
                    *existing = Value::Array(vec![previous, value]);
                }
            }
        }
    }

    fn add_existence(&mut self, field: &str, existence: Existence) -> bool {
        match field {
            "geopoint" => false,
            "hasImage" => {
                let has_image = existence == Existence::exists();
                self.rq.insert(field.to_string(), json!(has_image));
                true
            }
            _ => {
                self.rq.insert(field.to_string(), json!(existence));
                let kind = if existence == Existence::exists() { "exists" } else { "missing" };
                self.notes.push(format!(
                    "To match records where {field} is {}, I will search {field} for {{\"type\": \"{kind}\"}}",
                    if kind == "exists" { "specified" } else { "not specified" }
                ));
                true
            }
        }
    }

    fn group_by(&mut self, word: &str) -> bool {
        if self.top_field.is_some() {
            return false;
        }
        let word = word.trim().to_lowercase();
        if word == "species" {
            self.top_field = Some("scientificname");
            self.add("taxonrank", json!("species"));
            self.notes.push(
                "To count species I will break counts down by scientificname and only include \
                 species-level records"
                    .to_string(),
            );
            return true;
        }
        match field_alias(&word) {
            Some(field) if field != "geopoint" && field != "hasImage" => {
                self.top_field = Some(field);
                self.notes.push(format!("I will break record counts down by {field}"));
                true
            }
            _ => false,
        }
    }

    fn date_bounds(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if from.is_some() {
            self.date_from = from;
        }
        if to.is_some() {
            self.date_to = to;
        }
    }

    fn add_media(&mut self, mediatype: MediaType, mode: Mode) -> std::result::Result<(), String> {
        match mode {
            Mode::Media => match self.mediatype {
                Some(existing) if existing != mediatype => Err(
                    "The media search can only filter by one media type at a time, so I should abort."
                        .to_string(),
                ),
                _ => {
                    self.mediatype = Some(mediatype);
                    self.notes.push(format!(
                        "To filter by media type I will search the mq mediatype field for \"{}\"",
                        mediatype.as_str()
                    ));
                    Ok(())
                }
            },
            Mode::Records | Mode::Summary => match mediatype {
                MediaType::Images => {
                    self.rq.insert("hasImage".to_string(), json!(true));
                    self.notes
                        .push("To find records with images I will search hasImage for true".to_string());
                    Ok(())
                }
                MediaType::Sounds => Err(
                    "Occurrence records cannot be filtered by associated audio; this needs a media \
                     search, so I should abort."
                        .to_string(),
                ),
            },
        }
    }

    /// Classify one lowercase word. Returns whether it was consumed.
    fn consume_word(&mut self, lower: &str, mode: Mode) -> std::result::Result<bool, String> {
        if mode == Mode::Summary && self.group_by(lower) {
            return Ok(true);
        }
        if NEGATION_WORDS.contains(&lower) {
            return Err(format!(
                "iDigBio queries cannot exclude values (\"{lower}\"), so I should abort."
            ));
        }
        if STOPWORDS.contains(&lower) {
            return Ok(true);
        }
        if IMAGE_WORDS.contains(&lower) {
            self.add_media(MediaType::Images, mode)?;
            return Ok(true);
        }
        if SOUND_WORDS.contains(&lower) {
            self.add_media(MediaType::Sounds, mode)?;
            return Ok(true);
        }
        if let Some((_, field, value)) = GROUPS.iter().find(|(word, _, _)| *word == lower) {
            self.add(field, json!(value));
            self.notes.push(format!("\"{lower}\" corresponds to {field} {value}"));
            return Ok(true);
        }
        Ok(false)
    }

    fn add_names(&mut self, names: &[Vec<String>]) {
        match names {
            [] => {}
            [name] => {
                let mut parts = name.iter();
                if let Some(genus) = parts.next() {
                    self.add("genus", json!(capitalize(genus)));
                }
                if let Some(epithet) = parts.next() {
                    self.add("specificepithet", json!(epithet.to_lowercase()));
                }
                if let Some(epithet) = parts.next() {
                    self.add("infraspecificepithet", json!(epithet.to_lowercase()));
                }
                let display = canonical(name);
                self.notes.push(format!(
                    "The name {display} doesn't have authority specified, so I will search by genus{} \
                     instead of scientificname",
                    match name.len() {
                        1 => "",
                        2 => " and specificepithet",
                        _ => ", specificepithet and infraspecificepithet",
                    }
                ));
            }
            names if names.iter().all(|name| name.len() == 1) => {
                for name in names {
                    self.add("genus", json!(capitalize(&name[0])));
                }
                self.notes
                    .push("The request names several genera, so I will search genus using list syntax".to_string());
            }
            names => {
                for name in names {
                    self.add("scientificname", json!(canonical(name)));
                }
                self.notes.push(
                    "The request names several taxa, so I will search scientificname using list syntax"
                        .to_string(),
                );
            }
        }
    }

    fn finish_dates(&mut self) {
        if self.date_from.is_none() && self.date_to.is_none() {
            return;
        }
        let mut range = Map::new();
        range.insert("type".to_string(), json!("range"));
        if let Some(from) = self.date_from {
            range.insert("gte".to_string(), json!(from.to_string()));
        }
        if let Some(to) = self.date_to {
            range.insert("lte".to_string(), json!(to.to_string()));
        }
        self.rq.insert("datecollected".to_string(), Value::Object(range));
        self.notes
            .push("I will restrict datecollected to the requested dates".to_string());
    }

    fn plan_text(&self) -> String {
        if self.notes.is_empty() {
            "I will search without additional criteria.".to_string()
        } else {
            format!("{}.", self.notes.join(". "))
        }
    }

    fn record_query(&self) -> std::result::Result<RecordQuery, String> {
        serde_json::from_value(Value::Object(self.rq.clone())).map_err(|e| {
            format!(
                "The request combines criteria that cannot be expressed in a single iDigBio query ({e}), \
                 so I should abort."
            )
        })
    }
}

/// "Genus epithet" with conventional casing.
fn canonical(name: &[String]) -> String {
    name.iter()
        .enumerate()
        .map(|(i, part)| if i == 0 { capitalize(part) } else { part.to_lowercase() })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace every match for which `f` returns a replacement.
fn replace(re: &Regex, text: &str, mut f: impl FnMut(&Captures<'_>) -> Option<String>) -> String {
    re.replace_all(text, |caps: &Captures<'_>| {
        f(caps).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn unsupported(words: &[String]) -> Option<String> {
    let has = |list: &[&str]| words.iter().any(|w| list.contains(&w.as_str()));
    if has(PROXIMITY_WORDS) {
        Some(
            "The iDigBio API can not search for records near other records or places unless their \
             coordinates are given, so I should abort."
                .to_string(),
        )
    } else if has(COLOR_WORDS) {
        Some("There are no search parameters for color or other image features, so I should abort.".to_string())
    } else if has(QUALITY_WORDS) {
        Some("There are no search parameters for image quality, so I should abort.".to_string())
    } else {
        None
    }
}

#[allow(clippy::too_many_lines)]
fn parse(request: &str, mode: Mode) -> Outcome {
    let mut c = Criteria::default();

    let text = replace(&QUOTED, request, |caps| {
        let name = caps[1].trim().to_string();
        c.notes.push(format!(
            "The request quotes \"{name}\", so I will search by scientificname for an exact match"
        ));
        c.add("scientificname", json!(name));
        Some(SEP.to_string())
    });

    let words: Vec<String> = TOKEN
        .find_iter(&text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if let Some(reason) = unsupported(&words) {
        return Err(reason);
    }

    let text = replace(&AUTHORED_NAME, &text, |caps| {
        let name = format!("{} {}", caps[1].trim(), caps[2].trim());
        c.notes.push(format!(
            "The name \"{name}\" includes authority information, so I will search by scientificname"
        ));
        c.add("scientificname", json!(name));
        Some(SEP.to_string())
    });

    let text = replace(&COLLECTED_BY, &text, |caps| {
        let collector = caps[1].trim().to_string();
        c.notes.push(format!("I will filter by collector \"{collector}\""));
        c.add("collector", json!(collector));
        Some(SEP.to_string())
    });

    let text = replace(&MISSING, &text, |caps| {
        let word = caps[1].to_lowercase();
        let field = if IMAGE_WORDS.contains(&word.as_str()) {
            Some("hasImage")
        } else {
            field_alias(&word)
        };
        field
            .filter(|field| c.add_existence(*field, Existence::missing()))
            .map(|_| SEP.to_string())
    });

    let text = replace(&EXISTS, &text, |caps| {
        field_alias(&caps[1])
            .filter(|field| c.add_existence(*field, Existence::exists()))
            .map(|_| SEP.to_string())
    });

    let text = if mode == Mode::Summary {
        replace(&GROUP_BY, &text, |caps| c.group_by(&caps[1]).then(|| SEP.to_string()))
    } else {
        text
    };

    let text = replace(&RANK, &text, |caps| {
        let value = caps[2].to_lowercase();
        if STOPWORDS.contains(&value.as_str()) || NEGATION_WORDS.contains(&value.as_str()) {
            return None;
        }
        let field = caps[1].to_lowercase();
        let value = capitalize(&value);
        c.notes.push(format!("I will filter by {field} {value}"));
        c.add(&field, json!(value));
        Some(SEP.to_string())
    });

    let text = replace(&YEAR_RANGE, &text, |caps| {
        let from = caps[1].parse().ok().and_then(year_start);
        let to = caps[2].parse().ok().and_then(year_end);
        c.date_bounds(from, to);
        Some(SEP.to_string())
    });

    let text = replace(&CENTURY, &text, |caps| {
        let century: i32 = caps[1].parse().ok()?;
        c.date_bounds(year_start(century * 100), year_end(century * 100 + 99));
        Some(SEP.to_string())
    });

    let text = replace(&YEAR_BOUND, &text, |caps| {
        let year: i32 = caps[2].parse().ok()?;
        match caps[1].to_lowercase().as_str() {
            "before" => c.date_bounds(None, year_end(year - 1)),
            "after" => c.date_bounds(year_start(year + 1), None),
            "since" => c.date_bounds(year_start(year), None),
            _ => c.date_bounds(None, year_end(year)),
        }
        Some(SEP.to_string())
    });

    let text = replace(&YEAR, &text, |caps| {
        let year: i32 = caps[1].parse().ok()?;
        c.date_bounds(year_start(year), year_end(year));
        Some(SEP.to_string())
    });

    let text = replace(&LIMIT, &text, |caps| {
        let limit: u32 = caps[1].parse().ok()?;
        c.limit = Some(limit);
        Some(SEP.to_string())
    });

    let text = replace(&PLACE, &text, |caps| {
        for place in PLACE_SPLIT.split(&caps[1]) {
            let place = place.trim().trim_start_matches("the ").trim();
            if place.is_empty() {
                continue;
            }
            let field = if CONTINENTS.contains(&place) { "continent" } else { "country" };
            c.notes.push(format!("I will filter by {field} {place}"));
            c.add(field, json!(place));
        }
        Some(SEP.to_string())
    });

    let mut runs: Vec<Vec<String>> = Vec::new();
    let mut run: Vec<String> = Vec::new();
    let mut unparsed: Vec<String> = Vec::new();

    for token in TOKEN.find_iter(&text).map(|m| m.as_str()) {
        let lower = token.to_lowercase();
        let consumed = if lower.chars().all(|ch| ch.is_ascii_digit()) {
            match lower.parse::<u32>() {
                Ok(n) if c.limit.is_none() => c.limit = Some(n),
                _ => unparsed.push(token.to_string()),
            }
            true
        } else if !token.starts_with(char::is_alphabetic) {
            true
        } else {
            c.consume_word(&lower, mode)?
        };

        if consumed {
            if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        } else {
            run.push(token.to_string());
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }

    let mut names = Vec::new();
    for run in runs {
        match run.len() {
            1 if run[0].starts_with(char::is_uppercase) => match infer_rank(&run[0]) {
                "genus" => names.push(run),
                rank => {
                    let value = capitalize(&run[0]);
                    c.notes.push(format!("{value} is a {rank}, so I will search by {rank}"));
                    c.add(rank, json!(value));
                }
            },
            2 | 3 if looks_like_name(&run) => names.push(run),
            _ => unparsed.extend(run),
        }
    }

    if !unparsed.is_empty() {
        return Err(format!(
            "Unable to interpret \"{}\" as iDigBio search parameters, so I should abort.",
            unparsed.join(" ")
        ));
    }

    c.add_names(&names);
    c.finish_dates();
    Ok(c)
}

/// Translates requests with a fixed vocabulary, without a language model.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTranslator;

impl RuleTranslator {
    /// Create a rule translator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn checked<T: Validate>(plan: T) -> Result<T> {
        plan.validate()
            .map_err(|err| Error::generation_terminal(1, err.message))?;
        Ok(plan)
    }
}

#[async_trait]
impl Translator for RuleTranslator {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn records(&self, request: &str) -> Result<RecordsPlan> {
        let criteria = match parse(request, Mode::Records) {
            Ok(criteria) => criteria,
            Err(reason) => return Ok(RecordsPlan::abort(reason)),
        };
        let rq = match criteria.record_query() {
            Ok(rq) => rq,
            Err(reason) => return Ok(RecordsPlan::abort(reason)),
        };
        if rq.is_empty() {
            return Ok(RecordsPlan::abort(
                "The request does not contain any criteria that iDigBio records can be searched by, so \
                 I should abort.",
            ));
        }

        debug!(?rq, "parsed records request");
        let params = RecordsSearchParams {
            rq,
            limit: Some(criteria.limit.unwrap_or(DEFAULT_RECORDS_LIMIT)),
        };
        let plan = RecordsPlan::search(
            criteria.plan_text(),
            params,
            format!("Occurrence records matching \"{}\"", request.trim()),
        );
        Self::checked(plan.normalized())
    }

    async fn media(&self, request: &str) -> Result<MediaPlan> {
        let criteria = match parse(request, Mode::Media) {
            Ok(criteria) => criteria,
            Err(reason) => return Ok(MediaPlan::abort(reason)),
        };
        let rq = match criteria.record_query() {
            Ok(rq) => rq,
            Err(reason) => return Ok(MediaPlan::abort(reason)),
        };
        if rq.is_empty() && criteria.mediatype.is_none() {
            return Ok(MediaPlan::abort(
                "The request does not contain any criteria that iDigBio media can be searched by, so I \
                 should abort.",
            ));
        }

        debug!(?rq, mediatype = ?criteria.mediatype, "parsed media request");
        let params = MediaSearchParams {
            mq: criteria.mediatype.map(MediaQuery::of_type),
            rq: Some(rq),
            limit: criteria.limit,
        };
        let plan = MediaPlan::search(
            criteria.plan_text(),
            params,
            format!("Media records matching \"{}\"", request.trim()),
        );
        Self::checked(plan.normalized())
    }

    async fn summary(&self, request: &str) -> Result<SummaryPlan> {
        let criteria = parse(request, Mode::Summary).map_err(|reason| Error::generation_terminal(1, reason))?;
        let rq = criteria
            .record_query()
            .map_err(|reason| Error::generation_terminal(1, reason))?;

        let top_fields = criteria.top_field.unwrap_or(DEFAULT_TOP_FIELD);
        let count = criteria.limit.unwrap_or(if criteria.top_field.is_some() {
            MAX_LIMIT
        } else {
            DEFAULT_SUMMARY_COUNT
        });

        debug!(?rq, top_fields, count, "parsed summary request");
        let plan = SummaryPlan {
            plan: criteria.plan_text(),
            search_parameters: SummaryParams {
                top_fields: top_fields.to_string(),
                count: Some(count),
                rq: Some(rq),
            },
            artifact_description: format!(
                "Per-{top_fields} record counts matching \"{}\"",
                request.trim()
            ),
        };
        Self::checked(plan.normalized())
    }
}
