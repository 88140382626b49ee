use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ServerError;
use crate::services::conversion::ConversionJob;

pub const REQUIRED_FIELDS_MESSAGE: &str =
    "Audio URL, Image URL, artist name, and album name are required";

/// Body of `POST /convert`.
///
/// Every field is optional at the parsing layer so that a missing field is
/// reported with [`REQUIRED_FIELDS_MESSAGE`] rather than a serde error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// URL of the source audio file.
    #[serde(default)]
    pub audio_url: Option<String>,
    /// URL of the cover image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Artist names, written to the tag joined by `", "`.
    #[serde(default)]
    pub artists: Option<Vec<String>>,
    /// Album name.
    #[serde(default)]
    pub album: Option<String>,
}

impl TryFrom<ConvertRequest> for ConversionJob {
    type Error = ServerError;

    fn try_from(req: ConvertRequest) -> Result<Self, Self::Error> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        match (
            present(req.audio_url),
            present(req.image_url),
            req.artists,
            present(req.album),
        ) {
            (Some(audio_url), Some(image_url), Some(artists), Some(album)) => Ok(ConversionJob {
                audio_url,
                image_url,
                artists,
                album,
            }),
            _ => Err(ServerError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_owned())),
        }
    }
}

/// Successful conversion: the request echoed back plus the tagged file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub audio_url: String,
    pub image_url: String,
    pub artists: Vec<String>,
    pub album: String,
    /// The MP3 file, base64 encoded (standard alphabet, padded).
    pub audio_data: String,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
