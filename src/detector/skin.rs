use super::landmark::{DetectedFace, LandmarkModel, LandmarkModelLoader};
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::frame::FrameData;
use crate::geometry::BoundingBox;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::{
    distance_transform::Norm,
    morphology::{dilate, erode},
    region_labelling::{connected_components, Connectivity},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Tunables for skin-tone segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinModelParams {
    /// Inclusive Cb chroma range accepted as skin
    pub cb_range: (u8, u8),
    /// Inclusive Cr chroma range accepted as skin
    pub cr_range: (u8, u8),
    /// Opening kernel radius applied to the skin mask
    pub morphology_radius: u8,
    /// Accepted height/width ratio of a face region
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for SkinModelParams {
    fn default() -> Self {
        Self {
            cb_range: (77, 127),
            cr_range: (133, 173),
            morphology_radius: 1,
            min_aspect: 0.6,
            max_aspect: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegionStats {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

impl RegionStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
    }

    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Share of the bounding box covered by the region
    fn fill_ratio(&self) -> f32 {
        self.area as f32 / (self.width() * self.height()) as f32
    }
}

/// Landmark model built on skin segmentation.
///
/// Frames are downscaled, thresholded in YCbCr, cleaned with a morphological
/// opening and labelled into connected regions. Regions large enough and
/// roughly face-shaped become faces; landmarks follow face proportions.
pub struct SkinRegionModel {
    params: SkinModelParams,
    analysis_scale: u32,
    min_face_area: u32,
    max_faces: usize,
}

impl SkinRegionModel {
    pub fn new(params: SkinModelParams, config: &DetectorConfig) -> Self {
        Self {
            params,
            analysis_scale: config.analysis_scale.max(1),
            min_face_area: config.min_face_area,
            max_faces: config.max_faces,
        }
    }

    pub fn params(&self) -> &SkinModelParams {
        &self.params
    }

    fn is_skin(&self, pixel: &Rgba<u8>) -> bool {
        let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;

        let (cb_lo, cb_hi) = self.params.cb_range;
        let (cr_lo, cr_hi) = self.params.cr_range;
        cb >= cb_lo as f32 && cb <= cb_hi as f32 && cr >= cr_lo as f32 && cr <= cr_hi as f32
    }

    fn skin_mask(&self, image: &RgbaImage) -> GrayImage {
        let mut mask = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            if self.is_skin(pixel) {
                mask.put_pixel(x, y, Luma([255u8]));
            }
        }
        mask
    }

    fn collect_regions(&self, mask: &GrayImage) -> Vec<RegionStats> {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        let mut regions: HashMap<u32, RegionStats> = HashMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            regions
                .entry(label)
                .or_insert_with(|| RegionStats::new(x, y))
                .include(x, y);
        }

        let mut regions: Vec<RegionStats> = regions.into_values().collect();
        regions.sort_by(|a, b| b.area.cmp(&a.area));
        regions
    }

    fn accept(&self, region: &RegionStats) -> bool {
        if region.area < self.min_face_area {
            return false;
        }
        let aspect = region.height() as f32 / region.width() as f32;
        aspect >= self.params.min_aspect && aspect <= self.params.max_aspect
    }
}

impl LandmarkModel for SkinRegionModel {
    fn name(&self) -> &str {
        "skin-region"
    }

    fn detect(&self, frame: &FrameData) -> Result<Vec<DetectedFace>, DetectorError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::Inference {
                details: format!("empty frame {}", frame.id),
            });
        }

        let scale = self.analysis_scale;
        let analysis_w = (width / scale).max(1);
        let analysis_h = (height / scale).max(1);
        let small = imageops::resize(
            frame.pixels.as_ref(),
            analysis_w,
            analysis_h,
            FilterType::Nearest,
        );

        let mask = self.skin_mask(&small);
        let radius = self.params.morphology_radius;
        let cleaned = if radius > 0 {
            dilate(&erode(&mask, Norm::LInf, radius), Norm::LInf, radius)
        } else {
            mask
        };

        let scale_x = width as f32 / analysis_w as f32;
        let scale_y = height as f32 / analysis_h as f32;

        let faces: Vec<DetectedFace> = self
            .collect_regions(&cleaned)
            .into_iter()
            .filter(|region| self.accept(region))
            .take(self.max_faces)
            .map(|region| {
                let bbox = BoundingBox::new(
                    region.min_x as f32 * scale_x,
                    region.min_y as f32 * scale_y,
                    region.width() as f32 * scale_x,
                    region.height() as f32 * scale_y,
                );
                DetectedFace::from_box(bbox, region.fill_ratio().clamp(0.0, 1.0))
            })
            .collect();

        trace!(
            "Skin model found {} face(s) in frame {} ({}x{} analysis)",
            faces.len(),
            frame.id,
            analysis_w,
            analysis_h
        );
        Ok(faces)
    }
}

/// Loads the skin model, reading parameters from `detector.model_path` when set
pub struct SkinModelLoader {
    config: DetectorConfig,
}

impl SkinModelLoader {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LandmarkModelLoader for SkinModelLoader {
    async fn load(&self) -> Result<Arc<dyn LandmarkModel>, DetectorError> {
        let params = match &self.config.model_path {
            Some(path) => {
                debug!("Reading landmark model parameters from {}", path);
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    DetectorError::ModelLoad {
                        details: format!("{}: {}", path, e),
                    }
                })?;
                serde_json::from_str::<SkinModelParams>(&raw).map_err(|e| {
                    DetectorError::ModelLoad {
                        details: format!("{}: {}", path, e),
                    }
                })?
            }
            None => SkinModelParams::default(),
        };

        info!("Skin-region landmark model loaded: {:?}", params);
        Ok(Arc::new(SkinRegionModel::new(params, &self.config)))
    }
}
