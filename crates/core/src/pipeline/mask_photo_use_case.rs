use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::compositing::domain::asset_catalog::AssetCatalog;
use crate::compositing::domain::mask_compositor::{Composition, MaskCompositor};
use crate::compositing::domain::mask_style::{MaskStyle, UnknownStyle};
use crate::detection::domain::face_locator::FaceLocator;
use crate::imaging::domain::image_decoder::ImageDecoder;
use crate::imaging::domain::image_encoder::{EncodeError, ImageEncoder, OutputFormat};
use crate::preferences::domain::preference_store::PreferenceStore;
use crate::preferences::domain::user_id::UserId;
use crate::shared::face_box::FaceBox;

use super::mask_status::MaskStatus;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to encode masked photo: {0}")]
    Encode(#[from] EncodeError),
}

/// An encoded photo sent by a user.
#[derive(Clone, Debug)]
pub struct PhotoRequest {
    pub user: UserId,
    pub photo: Vec<u8>,
}

impl PhotoRequest {
    pub fn new(user: UserId, photo: Vec<u8>) -> Self {
        Self { user, photo }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaskOutcome {
    pub status: MaskStatus,
    /// Style that was in effect for the request.
    pub style: MaskStyle,
    /// Every face the locator returned, in scan order.
    pub faces: Vec<FaceBox>,
    /// Encoded result; present only on [`MaskStatus::Success`].
    pub image: Option<Vec<u8>>,
}

/// One-pass photo pipeline: decode → locate → composite first face → encode.
///
/// Holds no per-request state; the only thing that outlives a request is
/// the user's style choice in the [`PreferenceStore`].
pub struct MaskPhotoUseCase {
    decoder: Box<dyn ImageDecoder>,
    locator: Box<dyn FaceLocator>,
    compositor: Box<dyn MaskCompositor>,
    encoder: Box<dyn ImageEncoder>,
    catalog: Arc<dyn AssetCatalog>,
    preferences: Arc<dyn PreferenceStore>,
    output_format: OutputFormat,
    logger: Arc<dyn PipelineLogger>,
}

impl MaskPhotoUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        decoder: Box<dyn ImageDecoder>,
        locator: Box<dyn FaceLocator>,
        compositor: Box<dyn MaskCompositor>,
        encoder: Box<dyn ImageEncoder>,
        catalog: Arc<dyn AssetCatalog>,
        preferences: Arc<dyn PreferenceStore>,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            decoder,
            locator,
            compositor,
            encoder,
            catalog,
            preferences,
            output_format,
            logger: Arc::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Records `token` as the user's style for subsequent photos.
    pub fn choose_style(&self, user: UserId, token: &str) -> Result<MaskStyle, UnknownStyle> {
        let style: MaskStyle = token.parse()?;
        self.preferences.set_style(user, style);
        log::info!("User {user} chose {style}");
        Ok(style)
    }

    pub fn style_for(&self, user: UserId) -> MaskStyle {
        self.preferences.style_for(user).unwrap_or_default()
    }

    pub fn execute(&self, request: &PhotoRequest) -> Result<MaskOutcome, PipelineError> {
        let style = self.style_for(request.user);
        log::info!(
            "Photo from user {} ({} bytes), style {style}",
            request.user,
            request.photo.len()
        );
        let outcome = self.run(request, style)?;
        self.logger.outcome(outcome.status);
        Ok(outcome)
    }

    fn run(&self, request: &PhotoRequest, style: MaskStyle) -> Result<MaskOutcome, PipelineError> {
        let user = request.user;
        let rejected = |status, faces| MaskOutcome {
            status,
            style,
            faces,
            image: None,
        };

        let image = match self.timed("decode", || self.decoder.decode(&request.photo)) {
            Ok(image) => image,
            Err(e) => {
                log::info!("Rejecting photo from user {user}: {e}");
                return Ok(rejected(MaskStatus::DecodeFailed, Vec::new()));
            }
        };

        let faces = match self.timed("locate", || self.locator.locate(&image)) {
            Ok(faces) => faces,
            Err(e) => {
                log::info!("Rejecting photo from user {user}: {e}");
                return Ok(rejected(MaskStatus::DecodeFailed, Vec::new()));
            }
        };
        log::info!(
            "Found {} face(s) in {}x{} photo",
            faces.len(),
            image.width(),
            image.height()
        );
        if faces.is_empty() {
            return Ok(rejected(MaskStatus::NoFaceDetected, faces));
        }

        let asset = match self.catalog.asset(style) {
            Ok(asset) => asset,
            Err(e) => {
                log::error!("Cannot mask photo from user {user}: {e}");
                return Ok(rejected(MaskStatus::AssetUnavailable, faces));
            }
        };

        // One mask per photo: the first face in scan order that fits.
        let mut image = image;
        let mut masked = None;
        for face in &faces {
            let composition = self.timed("composite", || {
                self.compositor.composite(image, face, style, &asset)
            });
            match composition {
                Composition::Applied { image, region } => {
                    log::debug!("Applied {style} at {region}");
                    masked = Some(image);
                    break;
                }
                Composition::Skipped {
                    image: untouched,
                    reason,
                } => {
                    log::info!("Face {face} skipped ({reason:?})");
                    image = untouched;
                }
            }
        }
        let Some(image) = masked else {
            log::info!("No face in photo from user {user} fits a mask; treating as no face");
            return Ok(rejected(MaskStatus::NoFaceDetected, faces));
        };

        let encoded = self.timed("encode", || self.encoder.encode(&image, self.output_format))?;
        log::info!(
            "Masked photo for user {user} ready ({} bytes {})",
            encoded.len(),
            self.output_format.name()
        );

        Ok(MaskOutcome {
            status: MaskStatus::Success,
            style,
            faces,
            image: Some(encoded),
        })
    }

    fn timed<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!("{stage} took {ms:.1}ms");
        self.logger.timing(stage, ms);
        out
    }
}
