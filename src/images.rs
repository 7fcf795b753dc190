//! Image resolution: file or URL choices become image references, and the
//! references in a rendered view become decoded images for capture.
//!
//! Each of the three slots keeps a monotonic sequence number. Every request
//! against a slot takes the next number, and an upload that completes after
//! a newer request has been made is discarded, so the last choice wins even
//! when file reads finish out of order.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::error::ImageLoadError;
use crate::model::{ImageRef, PayslipImages, DEFAULT_LOGO};
use crate::surface::EmbeddedImage;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Which image a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Logo,
    EmployerSignature,
    EmployeeSignature,
}

impl SlotKind {
    pub const ALL: [SlotKind; 3] = [
        SlotKind::Logo,
        SlotKind::EmployerSignature,
        SlotKind::EmployeeSignature,
    ];

    fn default_value(self) -> Option<ImageRef> {
        match self {
            SlotKind::Logo => Some(ImageRef::Url(DEFAULT_LOGO.to_string())),
            SlotKind::EmployerSignature | SlotKind::EmployeeSignature => None,
        }
    }
}

/// A user's image choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// A local file, read and inlined as a data URI.
    File(PathBuf),
    /// A URL used verbatim after trimming.
    Url(String),
}

impl ImageInput {
    /// Interpret a CLI argument: http(s) and data references are URLs,
    /// everything else a file path. A `file://` prefix is dropped.
    pub fn from_arg(arg: &str) -> Self {
        let trimmed = arg.trim();
        let lower = trimmed.to_ascii_lowercase();
        if ["http://", "https://", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(*scheme))
        {
            ImageInput::Url(arg.to_string())
        } else if lower.starts_with("file://") {
            ImageInput::File(PathBuf::from(&trimmed["file://".len()..]))
        } else {
            ImageInput::File(PathBuf::from(arg))
        }
    }
}

/// Proof of a pending upload; hand it back with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    kind: SlotKind,
    seq: u64,
}

impl UploadTicket {
    pub fn kind(&self) -> SlotKind {
        self.kind
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Option<ImageRef>,
    seq: u64,
}

/// The logo and two signature slots.
#[derive(Debug, Clone)]
pub struct ImageSlots {
    logo: Slot,
    employer_signature: Slot,
    employee_signature: Slot,
}

impl Default for ImageSlots {
    fn default() -> Self {
        let slot = |kind: SlotKind| Slot {
            value: kind.default_value(),
            seq: 0,
        };
        Self {
            logo: slot(SlotKind::Logo),
            employer_signature: slot(SlotKind::EmployerSignature),
            employee_signature: slot(SlotKind::EmployeeSignature),
        }
    }
}

impl ImageSlots {
    fn slot(&self, kind: SlotKind) -> &Slot {
        match kind {
            SlotKind::Logo => &self.logo,
            SlotKind::EmployerSignature => &self.employer_signature,
            SlotKind::EmployeeSignature => &self.employee_signature,
        }
    }

    fn slot_mut(&mut self, kind: SlotKind) -> &mut Slot {
        match kind {
            SlotKind::Logo => &mut self.logo,
            SlotKind::EmployerSignature => &mut self.employer_signature,
            SlotKind::EmployeeSignature => &mut self.employee_signature,
        }
    }

    pub fn get(&self, kind: SlotKind) -> Option<&ImageRef> {
        self.slot(kind).value.as_ref()
    }

    /// Use a URL. Blank input is ignored and leaves the slot untouched.
    /// Returns whether the slot changed.
    pub fn set_url(&mut self, kind: SlotKind, url: &str) -> bool {
        let Some(reference) = ImageRef::parse(url) else {
            log::debug!("Ignoring empty image URL for {kind:?}");
            return false;
        };
        let slot = self.slot_mut(kind);
        slot.seq += 1;
        slot.value = Some(reference);
        log::debug!("{kind:?} set from URL (seq {})", slot.seq);
        true
    }

    /// Register an upload; any earlier pending upload for the slot is
    /// superseded.
    pub fn begin_upload(&mut self, kind: SlotKind) -> UploadTicket {
        let slot = self.slot_mut(kind);
        slot.seq += 1;
        UploadTicket {
            kind,
            seq: slot.seq,
        }
    }

    /// Apply a finished upload if it is still the latest request for its
    /// slot. Returns whether it was applied.
    pub fn complete_upload(&mut self, ticket: UploadTicket, data_uri: String) -> bool {
        let slot = self.slot_mut(ticket.kind);
        if ticket.seq != slot.seq {
            log::debug!(
                "Discarding stale {:?} upload (seq {} < {})",
                ticket.kind,
                ticket.seq,
                slot.seq
            );
            return false;
        }
        slot.value = Some(ImageRef::from(data_uri));
        log::debug!("{:?} set from upload (seq {})", ticket.kind, ticket.seq);
        true
    }

    /// Restore defaults. Pending uploads become stale.
    pub fn reset(&mut self) {
        for kind in SlotKind::ALL {
            let slot = self.slot_mut(kind);
            slot.seq += 1;
            slot.value = kind.default_value();
        }
    }

    pub fn to_payslip_images(&self) -> PayslipImages {
        PayslipImages {
            company_logo: self.get(SlotKind::Logo).cloned(),
            employer_signature: self.get(SlotKind::EmployerSignature).cloned(),
            employee_signature: self.get(SlotKind::EmployeeSignature).cloned(),
        }
    }
}

// ---------------------------------------------------------------------------
// File reading
// ---------------------------------------------------------------------------

/// Reads a local image into a self-contained data URI.
#[allow(async_fn_in_trait)]
pub trait FileReader {
    async fn read_as_data_uri(&self, path: &Path) -> Result<String, ImageLoadError>;
}

/// Reads from the local filesystem and sniffs the MIME type from the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

impl FileReader for FsFileReader {
    async fn read_as_data_uri(&self, path: &Path) -> Result<String, ImageLoadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ImageLoadError::Read {
                path: path.display().to_string(),
                source,
            })?;
        encode_data_uri(&bytes)
            .map_err(|_| ImageLoadError::UnknownFormat(path.display().to_string()))
    }
}

/// Encode image bytes as `data:<mime>;base64,...`.
pub fn encode_data_uri(bytes: &[u8]) -> Result<String, ImageLoadError> {
    let format = ::image::guess_format(bytes)
        .map_err(|e| ImageLoadError::UnknownFormat(e.to_string()))?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64_STD.encode(bytes)
    ))
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>, ImageLoadError> {
    let rest = src
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &src[5..])
        .ok_or_else(|| ImageLoadError::InvalidDataUri("missing `data:` scheme".to_string()))?;
    let (header, data) = rest.split_once(',').ok_or_else(|| {
        ImageLoadError::InvalidDataUri("missing `,` between header and data".to_string())
    })?;
    if !header.to_ascii_lowercase().contains(";base64") {
        return Err(ImageLoadError::InvalidDataUri(
            "only base64-encoded data URIs are supported".to_string(),
        ));
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| ImageLoadError::InvalidDataUri(format!("base64 decode error: {e}")))
}

// ---------------------------------------------------------------------------
// Loading for capture
// ---------------------------------------------------------------------------

/// Load the image behind an `src` attribute.
///
/// Data URIs are decoded in place, relative references are read under
/// `asset_root`, and http(s) URLs are fetched only when `use_cors` is set.
pub async fn load_image(
    src: &str,
    asset_root: &Path,
    use_cors: bool,
) -> Result<EmbeddedImage, ImageLoadError> {
    let lower = src.to_ascii_lowercase();
    let bytes = if lower.starts_with("data:") {
        parse_data_uri(src)?
    } else if lower.starts_with("http://") || lower.starts_with("https://") {
        if !use_cors {
            return Err(ImageLoadError::RemoteDisabled(src.to_string()));
        }
        fetch_remote(src).await?
    } else {
        let path = asset_root.join(src.trim_start_matches("file://"));
        tokio::fs::read(&path)
            .await
            .map_err(|source| ImageLoadError::Read {
                path: path.display().to_string(),
                source,
            })?
    };
    decode_embedded(bytes)
}

async fn fetch_remote(url: &str) -> Result<Vec<u8>, ImageLoadError> {
    let fetch_err = |e: reqwest::Error| ImageLoadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    };
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(fetch_err)?;
    let bytes = response.bytes().await.map_err(fetch_err)?;
    Ok(bytes.to_vec())
}

/// Decode with the `image` crate to obtain pixel dimensions.
fn decode_embedded(bytes: Vec<u8>) -> Result<EmbeddedImage, ImageLoadError> {
    let img = ::image::load_from_memory(&bytes).map_err(|e| ImageLoadError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(ImageLoadError::Decode("image has zero size".to_string()));
    }
    Ok(EmbeddedImage {
        px_width: img.width(),
        px_height: img.height(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1×1 transparent PNG
    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn slots_start_with_defaults() {
        let slots = ImageSlots::default();
        assert_eq!(
            slots.get(SlotKind::Logo),
            Some(&ImageRef::Url(DEFAULT_LOGO.to_string()))
        );
        assert_eq!(slots.get(SlotKind::EmployerSignature), None);
        assert_eq!(slots.get(SlotKind::EmployeeSignature), None);
    }

    #[test]
    fn blank_url_is_ignored() {
        let mut slots = ImageSlots::default();
        assert!(!slots.set_url(SlotKind::Logo, "   "));
        assert_eq!(
            slots.get(SlotKind::Logo),
            Some(&ImageRef::Url(DEFAULT_LOGO.to_string()))
        );
        assert!(slots.set_url(SlotKind::Logo, " https://cdn.example.com/a.png "));
        assert_eq!(
            slots.get(SlotKind::Logo).map(ImageRef::as_str),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn stale_upload_is_discarded() {
        let mut slots = ImageSlots::default();
        let first = slots.begin_upload(SlotKind::EmployeeSignature);
        let second = slots.begin_upload(SlotKind::EmployeeSignature);

        assert!(slots.complete_upload(second, "data:image/png;base64,BBBB".into()));
        assert!(!slots.complete_upload(first, "data:image/png;base64,AAAA".into()));
        assert_eq!(
            slots.get(SlotKind::EmployeeSignature).map(ImageRef::as_str),
            Some("data:image/png;base64,BBBB")
        );
    }

    #[test]
    fn url_choice_supersedes_pending_upload() {
        let mut slots = ImageSlots::default();
        let ticket = slots.begin_upload(SlotKind::Logo);
        slots.set_url(SlotKind::Logo, "https://example.com/new.png");
        assert!(!slots.complete_upload(ticket, "data:image/png;base64,AAAA".into()));
    }

    #[test]
    fn reset_supersedes_pending_upload() {
        let mut slots = ImageSlots::default();
        let ticket = slots.begin_upload(SlotKind::EmployerSignature);
        slots.reset();
        assert!(!slots.complete_upload(ticket, "data:image/png;base64,AAAA".into()));
        assert_eq!(slots.get(SlotKind::EmployerSignature), None);
    }

    #[test]
    fn other_slots_are_independent() {
        let mut slots = ImageSlots::default();
        let logo = slots.begin_upload(SlotKind::Logo);
        slots.begin_upload(SlotKind::EmployerSignature);
        assert!(slots.complete_upload(logo, "data:image/png;base64,AAAA".into()));
    }

    #[test]
    fn data_uri_encoding_sniffs_png() {
        let bytes = BASE64_STD.decode(PNG_1X1).unwrap();
        let uri = encode_data_uri(&bytes).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(parse_data_uri(&uri).unwrap(), bytes);
        assert!(encode_data_uri(b"not an image").is_err());
    }

    #[test]
    fn parse_data_uri_rejects_non_base64() {
        assert!(parse_data_uri("data:image/svg+xml,<svg/>").is_err());
        assert!(parse_data_uri("https://example.com").is_err());
    }

    #[test]
    fn cli_argument_classification() {
        assert_eq!(
            ImageInput::from_arg("https://x.test/logo.png"),
            ImageInput::Url("https://x.test/logo.png".into())
        );
        assert_eq!(
            ImageInput::from_arg("sig.png"),
            ImageInput::File(PathBuf::from("sig.png"))
        );
        assert_eq!(
            ImageInput::from_arg("file:///srv/assets/sig.png"),
            ImageInput::File(PathBuf::from("/srv/assets/sig.png"))
        );
        assert_eq!(
            ImageInput::from_arg(" FILE://sig.png"),
            ImageInput::File(PathBuf::from("sig.png"))
        );
    }

    #[tokio::test]
    async fn load_image_decodes_data_uri() {
        let src = format!("data:image/png;base64,{PNG_1X1}");
        let img = load_image(&src, Path::new("."), false).await.unwrap();
        assert_eq!((img.px_width, img.px_height), (1, 1));
    }

    #[tokio::test]
    async fn remote_images_need_cors() {
        let err = load_image("https://example.com/logo.png", Path::new("."), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::RemoteDisabled(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = FsFileReader
            .read_as_data_uri(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::Read { .. }));
    }
}
