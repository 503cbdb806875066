//! Champion Roster - shared types
//!
//! Record model, rank vocabulary, data-URI image codec and the error kinds
//! shared by the durable store and the client cache.

pub mod champion;
pub mod error;
pub mod image;

pub use champion::{
    new_champion_id, validate_name, validate_rank_options, AddChampion, ChampionClass,
    ChampionPatch, ChampionRecord, NewChampion, StarRating,
};
pub use error::{Result, RosterError};
pub use image::{decode_optional, sniff_mime, ImagePayload, MAX_IMAGE_BYTES};
