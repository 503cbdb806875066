//! Champion records and the rank vocabulary
//!
//! Field names serialize in camelCase because the same JSON shape is used on
//! the wire and in the client's persisted cache.

use crate::error::{Result, RosterError};
use crate::image::ImagePayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Champion class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChampionClass {
    Cosmic,
    Mutant,
    Mystic,
    Science,
    Skill,
    Tech,
}

impl ChampionClass {
    /// Every class, in display order
    pub const ALL: [ChampionClass; 6] = [
        ChampionClass::Cosmic,
        ChampionClass::Mutant,
        ChampionClass::Mystic,
        ChampionClass::Science,
        ChampionClass::Skill,
        ChampionClass::Tech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChampionClass::Cosmic => "Cosmic",
            ChampionClass::Mutant => "Mutant",
            ChampionClass::Mystic => "Mystic",
            ChampionClass::Science => "Science",
            ChampionClass::Skill => "Skill",
            ChampionClass::Tech => "Tech",
        }
    }
}

impl fmt::Display for ChampionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChampionClass {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| RosterError::Validation(format!("unknown champion class: {:?}", s)))
    }
}

/// Star rating. Decides which rank options are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StarRating {
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
}

const SIX_STAR_RANKS: &[&str] = &["Rank 4", "Rank 5", "Rank 6 (Ascended)"];
const SEVEN_STAR_RANKS: &[&str] = &["Rank 1", "Rank 2", "Rank 3"];

impl StarRating {
    pub const ALL: [StarRating; 2] = [StarRating::Six, StarRating::Seven];

    pub fn as_str(&self) -> &'static str {
        match self {
            StarRating::Six => "6",
            StarRating::Seven => "7",
        }
    }

    /// The rank options a champion of this rating may offer
    pub fn rank_vocabulary(&self) -> &'static [&'static str] {
        match self {
            StarRating::Six => SIX_STAR_RANKS,
            StarRating::Seven => SEVEN_STAR_RANKS,
        }
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}★", self.as_str())
    }
}

impl FromStr for StarRating {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "6" => Ok(StarRating::Six),
            "7" => Ok(StarRating::Seven),
            _ => Err(RosterError::Validation(format!(
                "unknown star rating: {:?}",
                s
            ))),
        }
    }
}

/// Check a name is present after trimming
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(RosterError::Validation(
            "champion name is required".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Check rank options are a non-empty, duplicate-free subset of the rating's vocabulary
pub fn validate_rank_options(rating: StarRating, options: &[String]) -> Result<()> {
    if options.is_empty() {
        return Err(RosterError::Validation(
            "at least one rank option is required".to_string(),
        ));
    }

    let vocabulary = rating.rank_vocabulary();
    for (i, option) in options.iter().enumerate() {
        if !vocabulary.contains(&option.as_str()) {
            return Err(RosterError::Validation(format!(
                "{:?} is not a valid rank option for {} champions",
                option, rating
            )));
        }
        if options[..i].contains(option) {
            return Err(RosterError::Validation(format!(
                "rank option {:?} is listed twice",
                option
            )));
        }
    }
    Ok(())
}

fn validate_image(uri: Option<&str>) -> Result<()> {
    match uri {
        Some(s) if !s.is_empty() => ImagePayload::parse_data_uri(s).map(|_| ()),
        _ => Ok(()),
    }
}

/// Generate a fresh champion id
pub fn new_champion_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A champion roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionRecord {
    pub id: String,
    pub name: String,
    pub class: ChampionClass,
    pub star_rating: StarRating,
    pub rank_options: Vec<String>,
    /// Data URI
    #[serde(default)]
    pub portrait_image: Option<String>,
    /// Data URI
    #[serde(default)]
    pub full_image: Option<String>,
}

/// A champion record before it has been assigned an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChampion {
    pub name: String,
    pub class: ChampionClass,
    pub star_rating: StarRating,
    pub rank_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_image: Option<String>,
}

impl NewChampion {
    /// Minimal champion without images
    pub fn new(
        name: impl Into<String>,
        class: ChampionClass,
        star_rating: StarRating,
        rank_options: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            class,
            star_rating,
            rank_options: rank_options.iter().map(|s| s.to_string()).collect(),
            portrait_image: None,
            full_image: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_rank_options(self.star_rating, &self.rank_options)?;
        validate_image(self.portrait_image.as_deref())?;
        validate_image(self.full_image.as_deref())
    }

    /// Attach an id. The name is stored trimmed.
    pub fn with_id(self, id: String) -> ChampionRecord {
        ChampionRecord {
            id,
            name: self.name.trim().to_string(),
            class: self.class,
            star_rating: self.star_rating,
            rank_options: self.rank_options,
            portrait_image: self.portrait_image,
            full_image: self.full_image,
        }
    }
}

/// Body of an add request. Carries the client's id when it already has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChampion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub champion: NewChampion,
}

impl AddChampion {
    /// Turn into a record, generating an id when none was sent
    pub fn into_record(self) -> ChampionRecord {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => new_champion_id(),
        };
        self.champion.with_id(id)
    }
}

impl From<ChampionRecord> for AddChampion {
    fn from(record: ChampionRecord) -> Self {
        Self {
            id: Some(record.id),
            champion: NewChampion {
                name: record.name,
                class: record.class,
                star_rating: record.star_rating,
                rank_options: record.rank_options,
                portrait_image: record.portrait_image,
                full_image: record.full_image,
            },
        }
    }
}

/// Partial update. Absent fields are left untouched; images are never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ChampionClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<StarRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_image: Option<String>,
}

/// Every field of the record, for re-sending it as a whole
impl From<ChampionRecord> for ChampionPatch {
    fn from(record: ChampionRecord) -> Self {
        Self {
            name: Some(record.name),
            class: Some(record.class),
            star_rating: Some(record.star_rating),
            rank_options: Some(record.rank_options),
            portrait_image: record.portrait_image,
            full_image: record.full_image,
        }
    }
}

impl ChampionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.class.is_none()
            && self.star_rating.is_none()
            && self.rank_options.is_none()
            && self.portrait_image.is_none()
            && self.full_image.is_none()
    }

    /// Checks that need no knowledge of the stored record
    pub fn validate_fields(&self) -> Result<()> {
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        validate_image(self.portrait_image.as_deref())?;
        validate_image(self.full_image.as_deref())
    }

    /// Full validation against the record the patch will be merged into
    pub fn validate_against(&self, current: &ChampionRecord) -> Result<()> {
        self.validate_fields()?;
        if self.star_rating.is_some() || self.rank_options.is_some() {
            let rating = self.star_rating.unwrap_or(current.star_rating);
            let options = self.rank_options.as_deref().unwrap_or(&current.rank_options);
            validate_rank_options(rating, options)?;
        }
        Ok(())
    }

    /// Merge into a record in place
    pub fn apply_to(&self, record: &mut ChampionRecord) {
        if let Some(ref name) = self.name {
            record.name = name.trim().to_string();
        }
        if let Some(class) = self.class {
            record.class = class;
        }
        if let Some(rating) = self.star_rating {
            record.star_rating = rating;
        }
        if let Some(ref options) = self.rank_options {
            record.rank_options = options.clone();
        }
        if let Some(ref image) = self.portrait_image {
            if !image.is_empty() {
                record.portrait_image = Some(image.clone());
            }
        }
        if let Some(ref image) = self.full_image {
            if !image.is_empty() {
                record.full_image = Some(image.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(options: &[&str]) -> Vec<String> {
        options.iter().map(|s| s.to_string()).collect()
    }

    fn sample_record() -> ChampionRecord {
        NewChampion::new(
            "Doctor Doom",
            ChampionClass::Mystic,
            StarRating::Six,
            &["Rank 4", "Rank 5"],
        )
        .with_id("doom".to_string())
    }

    #[test]
    fn vocabulary_depends_on_rating() {
        assert_eq!(
            StarRating::Six.rank_vocabulary(),
            &["Rank 4", "Rank 5", "Rank 6 (Ascended)"]
        );
        assert_eq!(
            StarRating::Seven.rank_vocabulary(),
            &["Rank 1", "Rank 2", "Rank 3"]
        );
    }

    #[test]
    fn rank_options_must_not_be_empty() {
        let err = validate_rank_options(StarRating::Six, &[]).unwrap_err();
        assert!(matches!(err, RosterError::Validation(_)));
    }

    #[test]
    fn seven_star_rank_rejected_for_six_star() {
        let err = validate_rank_options(StarRating::Six, &ranks(&["Rank 1"])).unwrap_err();
        assert!(matches!(err, RosterError::Validation(_)));
    }

    #[test]
    fn duplicate_rank_options_rejected() {
        let err =
            validate_rank_options(StarRating::Seven, &ranks(&["Rank 2", "Rank 2"])).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn rank_option_order_is_insignificant() {
        validate_rank_options(StarRating::Six, &ranks(&["Rank 6 (Ascended)", "Rank 4"])).unwrap();
    }

    #[test]
    fn blank_name_rejected() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("Hulk").is_ok());
    }

    #[test]
    fn class_and_rating_parse_from_display_names() {
        assert_eq!("Science".parse::<ChampionClass>().unwrap(), ChampionClass::Science);
        assert!("science".parse::<ChampionClass>().is_err());
        assert_eq!("7".parse::<StarRating>().unwrap(), StarRating::Seven);
        assert!("5".parse::<StarRating>().is_err());
    }

    #[test]
    fn record_serializes_in_camel_case() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["starRating"], "6");
        assert_eq!(json["class"], "Mystic");
        assert_eq!(json["rankOptions"][1], "Rank 5");
        assert!(json["portraitImage"].is_null());
    }

    #[test]
    fn add_request_flattens_record_fields() {
        let json = r#"{
            "id": "abc",
            "name": "Hulk",
            "class": "Science",
            "starRating": "7",
            "rankOptions": ["Rank 1"]
        }"#;

        let request: AddChampion = serde_json::from_str(json).unwrap();
        let record = request.into_record();
        assert_eq!(record.id, "abc");
        assert_eq!(record.class, ChampionClass::Science);
        assert_eq!(record.portrait_image, None);
    }

    #[test]
    fn add_request_without_id_generates_one() {
        let request = AddChampion {
            id: None,
            champion: NewChampion::new("Hulk", ChampionClass::Science, StarRating::Seven, &["Rank 1"]),
        };
        let a = request.clone().into_record();
        let b = request.into_record();
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn patch_keeps_images_it_was_not_given() {
        let mut record = sample_record();
        record.portrait_image = Some("data:image/png;base64,AAEC".to_string());

        let patch = ChampionPatch {
            name: Some("  Victor  ".to_string()),
            portrait_image: Some(String::new()),
            ..Default::default()
        };
        patch.apply_to(&mut record);

        assert_eq!(record.name, "Victor");
        assert_eq!(
            record.portrait_image.as_deref(),
            Some("data:image/png;base64,AAEC")
        );
    }

    #[test]
    fn patch_rating_change_revalidates_existing_ranks() {
        let record = sample_record();
        let patch = ChampionPatch {
            star_rating: Some(StarRating::Seven),
            ..Default::default()
        };
        assert!(patch.validate_against(&record).is_err());

        let patch = ChampionPatch {
            star_rating: Some(StarRating::Seven),
            rank_options: Some(ranks(&["Rank 3"])),
            ..Default::default()
        };
        patch.validate_against(&record).unwrap();
    }

    #[test]
    fn patch_from_record_carries_every_field() {
        let mut record = sample_record();
        record.full_image = Some("data:image/png;base64,AAEC".to_string());

        let patch = ChampionPatch::from(record.clone());
        assert_eq!(patch.portrait_image, None);

        let mut target = NewChampion::new("Other", ChampionClass::Tech, StarRating::Six, &["Rank 4"])
            .with_id("doom".to_string());
        patch.apply_to(&mut target);
        assert_eq!(target, record);
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let patch = ChampionPatch::default();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), "{}");
    }
}
