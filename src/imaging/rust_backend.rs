//! Pure Rust decode/resize backend with libwebp for the lossy encode.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP) | `image::load_from_memory` (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) + BT.601 YUV→RGB |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy at the given quality) |
//!
//! GIF input yields its first frame, matching what a canvas draw of an
//! animated GIF produces.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, ResizeParams};
use image::DynamicImage;
use image::imageops::FilterType;
use std::io::Cursor;

/// Production pixel codec.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(message: impl Into<String>) -> BackendError {
    BackendError::ProcessingFailed(message.into())
}

/// True when the bytes start with an ISO-BMFF `ftyp` box naming an AVIF brand.
///
/// Both the major brand and the compatible brand list are checked, since some
/// encoders write `mif1` as the major brand.
fn is_avif(bytes: &[u8]) -> bool {
    if bytes.len() < 16 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_len.clamp(16, bytes.len());
    bytes[8..end]
        .chunks_exact(4)
        .any(|brand| brand == b"avif" || brand == b"avis")
}

/// Decode an AVIF still image using avif-parse (container) + rav1d (AV1 decode).
///
/// The `image` crate only decodes AVIF through the C library dav1d, so the
/// primary item is fed to `rav1d`, the pure Rust port, directly.
fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    let avif = avif_parse::read_avif(&mut Cursor::new(bytes))
        .map_err(|e| failed(format!("Failed to parse AVIF container: {e:?}")))?;
    let payload: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    unsafe { dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast()) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(failed(format!("rav1d open failed ({})", rc.0)));
    }

    // Everything between open and close runs in here so the context is closed
    // on every exit path.
    let decoded = (|| {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), payload.len()) };
        if buf.is_null() {
            return Err(failed("rav1d data_create failed"));
        }
        unsafe { std::ptr::copy_nonoverlapping(payload.as_ptr(), buf, payload.len()) };

        let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
        if rc.0 != 0 {
            unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(failed(format!("rav1d send_data failed ({})", rc.0)));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
        if rc.0 != 0 {
            return Err(failed(format!("rav1d get_picture failed ({})", rc.0)));
        }

        let frame = YuvFrame::from_picture(&pic);
        unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };
        frame
    })();

    unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };

    let (width, height, rgb) = decoded?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| failed("Decoded AVIF buffer does not match its dimensions"))
}

/// One plane of a decoded picture.
#[derive(Clone, Copy)]
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    /// Read one sample; 10- and 12-bit content is stored as `u16`.
    ///
    /// # Safety
    /// `(x, y)` must lie inside the plane the pointer was taken from.
    unsafe fn sample(self, x: u32, y: u32, high_depth: bool) -> f32 {
        let row = y as isize * self.stride;
        if high_depth {
            unsafe { *(self.ptr.offset(row + x as isize * 2) as *const u16) as f32 }
        } else {
            unsafe { *self.ptr.offset(row + x as isize) as f32 }
        }
    }
}

/// Borrowed view of a rav1d picture, converted to interleaved RGB8.
struct YuvFrame {
    luma: Plane,
    /// `None` for monochrome (I400) content.
    chroma: Option<(Plane, Plane)>,
    width: u32,
    height: u32,
    bpc: u32,
    /// Horizontal and vertical chroma subsampling.
    subsampling: (bool, bool),
}

impl YuvFrame {
    /// Convert a decoded picture into `(width, height, rgb)`.
    fn from_picture(
        pic: &rav1d::include::dav1d::picture::Dav1dPicture,
    ) -> Result<(u32, u32, Vec<u8>), BackendError> {
        use rav1d::include::dav1d::headers::{
            DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
            DAV1D_PIXEL_LAYOUT_I444,
        };

        let plane = |index: usize, stride: isize| -> Result<Plane, BackendError> {
            pic.data[index]
                .map(|p| Plane {
                    ptr: p.as_ptr() as *const u8,
                    stride,
                })
                .ok_or_else(|| failed(format!("AVIF picture is missing plane {index}")))
        };

        let layout = pic.p.layout;
        let (chroma, subsampling) = match layout {
            DAV1D_PIXEL_LAYOUT_I400 => (None, (false, false)),
            DAV1D_PIXEL_LAYOUT_I420 => (Some((1, 2)), (true, true)),
            DAV1D_PIXEL_LAYOUT_I422 => (Some((1, 2)), (true, false)),
            DAV1D_PIXEL_LAYOUT_I444 => (Some((1, 2)), (false, false)),
            _ => return Err(failed(format!("Unsupported AVIF pixel layout: {layout}"))),
        };
        let chroma = match chroma {
            Some((u, v)) => Some((plane(u, pic.stride[1])?, plane(v, pic.stride[1])?)),
            None => None,
        };

        let frame = YuvFrame {
            luma: plane(0, pic.stride[0])?,
            chroma,
            width: pic.p.w as u32,
            height: pic.p.h as u32,
            bpc: pic.p.bpc as u32,
            subsampling,
        };
        Ok((frame.width, frame.height, frame.to_rgb8()))
    }

    /// BT.601 YCbCr → RGB, scaled down to 8 bits per channel.
    fn to_rgb8(&self) -> Vec<u8> {
        let high_depth = self.bpc > 8;
        let scale = 255.0 / ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let (ss_x, ss_y) = self.subsampling;

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                // SAFETY: x < width and y < height, and chroma coordinates are
                // divided down to the subsampled plane size.
                let luma = unsafe { self.luma.sample(x, y, high_depth) };
                let pixel = match self.chroma {
                    None => [luma; 3],
                    Some((u, v)) => {
                        let cx = if ss_x { x / 2 } else { x };
                        let cy = if ss_y { y / 2 } else { y };
                        let cb = unsafe { u.sample(cx, cy, high_depth) } - center;
                        let cr = unsafe { v.sample(cx, cy, high_depth) } - center;
                        [
                            luma + 1.402 * cr,
                            luma - 0.344136 * cb - 0.714136 * cr,
                            luma + 1.772 * cb,
                        ]
                    }
                };
                rgb.extend(pixel.map(|c| (c * scale).clamp(0.0, 255.0) as u8));
            }
        }
        rgb
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let surface = if is_avif(bytes) {
            decode_avif(bytes)?
        } else {
            image::load_from_memory(bytes).map_err(|e| failed(format!("Failed to decode: {e}")))?
        };
        if surface.width() == 0 || surface.height() == 0 {
            return Err(failed("Decoded image has no pixels"));
        }
        Ok(surface)
    }

    fn resize(
        &self,
        surface: &DynamicImage,
        params: &ResizeParams,
    ) -> Result<DynamicImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(failed(format!(
                "Cannot resize to {}x{}",
                params.width, params.height
            )));
        }
        if surface.width() == params.width && surface.height() == params.height {
            return Ok(surface.clone());
        }
        Ok(surface.resize_exact(params.width, params.height, FilterType::Lanczos3))
    }

    fn encode_webp(
        &self,
        surface: &DynamicImage,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        // libwebp takes quality on a 0-100 scale.
        let level = quality.factor() * 100.0;
        let memory = if surface.color().has_alpha() {
            let rgba = surface.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode_simple(false, level)
        } else {
            let rgb = surface.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                .encode_simple(false, level)
        }
        .map_err(|e| failed(format!("WebP encode failed: {e:?}")))?;
        Ok(memory.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn encoded(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn avif_sniffing_checks_brands() {
        let mut header = Vec::new();
        header.extend_from_slice(&24u32.to_be_bytes());
        header.extend_from_slice(b"ftypmif1\0\0\0\0avifmiaf");
        assert!(is_avif(&header));

        let mut heic = Vec::new();
        heic.extend_from_slice(&24u32.to_be_bytes());
        heic.extend_from_slice(b"ftypheic\0\0\0\0mif1heic");
        assert!(!is_avif(&heic));

        assert!(!is_avif(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn decodes_png_and_jpeg() {
        let backend = RustBackend::new();
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
            let surface = backend
                .decode(&encoded(gradient(40, 30), format))
                .unwrap();
            assert_eq!((surface.width(), surface.height()), (40, 30), "{format:?}");
        }
    }

    fn encoded_avif(img: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut bytes, 6, 85);
        img.write_with_encoder(encoder).unwrap();
        bytes
    }

    #[test]
    fn decodes_avif() {
        let bytes = encoded_avif(&gradient(64, 48));
        assert!(is_avif(&bytes));

        let surface = RustBackend::new().decode(&bytes).unwrap();
        assert_eq!((surface.width(), surface.height()), (64, 48));

        // Lossy, but the blue channel of the gradient stays near 128.
        let rgb = surface.to_rgb8();
        let blue = rgb.get_pixel(32, 24)[2];
        assert!((100..=156).contains(&blue), "blue = {blue}");
    }

    #[test]
    fn decodes_avif_with_odd_dimensions() {
        let bytes = encoded_avif(&gradient(33, 17));
        let surface = RustBackend::new().decode(&bytes).unwrap();
        assert_eq!((surface.width(), surface.height()), (33, 17));
    }

    #[test]
    fn yuv_frame_converts_neutral_chroma_to_gray() {
        let luma = [0u8, 128, 255, 64];
        let neutral = [128u8; 4];
        let plane = |data: &[u8]| Plane {
            ptr: data.as_ptr(),
            stride: 2,
        };
        let frame = YuvFrame {
            luma: plane(&luma),
            chroma: Some((plane(&neutral), plane(&neutral))),
            width: 2,
            height: 2,
            bpc: 8,
            subsampling: (false, false),
        };
        let rgb = frame.to_rgb8();
        assert_eq!(rgb.len(), 2 * 2 * 3);
        assert_eq!(rgb, vec![0, 0, 0, 128, 128, 128, 255, 255, 255, 64, 64, 64]);

        let mono = YuvFrame {
            chroma: None,
            ..frame
        };
        assert_eq!(mono.to_rgb8(), rgb);
    }

    #[test]
    fn decode_rejects_garbage() {
        let backend = RustBackend::new();
        assert!(backend.decode(b"definitely not an image").is_err());
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let backend = RustBackend::new();
        let resized = backend
            .resize(&gradient(300, 200), &ResizeParams { width: 150, height: 100 })
            .unwrap();
        assert_eq!((resized.width(), resized.height()), (150, 100));
    }

    #[test]
    fn encode_webp_produces_riff_container() {
        let backend = RustBackend::new();
        let out = backend.encode_webp(&gradient(64, 48), Quality::new(80)).unwrap();
        assert!(out.len() > 12);
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");

        let decoded = image::load_from_memory_with_format(&out, ImageFormat::WebP).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn encode_webp_keeps_alpha_images_decodable() {
        let backend = RustBackend::new();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 128])));
        let out = backend.encode_webp(&img, Quality::new(90)).unwrap();
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::WebP).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }
}
