//! Boosted Haar cascade in OpenCV's `opencv-cascade-classifier` XML format.
//!
//! Only upright Haar features with stump or tree weak classifiers are
//! supported, which covers the stock `haarcascade_frontalface_*` models.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::Node;
use thiserror::Error;

use super::integral_image::IntegralImage;

/// Stage thresholds are stored slightly lowered to absorb float noise in
/// trained values.
const THRESHOLD_EPS: f64 = 1e-5;

/// Smallest window that still has a non-empty normalization rectangle.
const MIN_WINDOW_SIDE: u32 = 3;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cascade is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("cascade is missing <{0}>")]
    MissingElement(&'static str),
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("malformed cascade: {0}")]
    Malformed(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

/// Split node: `value < threshold` follows `left`, otherwise `right`.
/// Child indices `<= 0` are leaves, addressed as `leaves[-idx]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeakTree {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub threshold: f64,
    pub trees: Vec<WeakTree>,
}

/// Outcome of running the cascade on one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    RejectedAt(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CascadeModel {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl CascadeModel {
    pub fn from_file(path: &Path) -> Result<Self, CascadeError> {
        let text = fs::read_to_string(path).map_err(|source| CascadeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_xml(&text)?;
        log::info!(
            "Loaded cascade {} ({} stages, {} features, {}x{} window)",
            path.display(),
            model.stages.len(),
            model.features.len(),
            model.window_width,
            model.window_height
        );
        Ok(model)
    }

    pub fn from_xml(text: &str) -> Result<Self, CascadeError> {
        let doc = roxmltree::Document::parse(text)?;
        let cascade = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or(CascadeError::MissingElement("cascade"))?;

        if let Some(kind) = child_text(cascade, "stageType") {
            if kind != "BOOST" {
                return Err(CascadeError::Unsupported(format!("stage type {kind}")));
            }
        }
        if let Some(kind) = child_text(cascade, "featureType") {
            if kind != "HAAR" {
                return Err(CascadeError::Unsupported(format!("feature type {kind}")));
            }
        }

        let window_width: u32 = parse_child(cascade, "width")?;
        let window_height: u32 = parse_child(cascade, "height")?;
        if window_width < MIN_WINDOW_SIDE || window_height < MIN_WINDOW_SIDE {
            return Err(CascadeError::Malformed(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let features = items(child(cascade, "features")?)
            .map(parse_feature)
            .collect::<Result<Vec<_>, _>>()?;
        let stages = items(child(cascade, "stages")?)
            .map(parse_stage)
            .collect::<Result<Vec<_>, _>>()?;

        let model = Self {
            window_width,
            window_height,
            stages,
            features,
        };
        model.check_consistency()?;
        Ok(model)
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Runs every stage on the window whose top-left corner is `(x, y)`.
    ///
    /// The window must fit inside `integral`.
    pub fn evaluate(&self, integral: &IntegralImage, x: u32, y: u32) -> Verdict {
        let inv_norm = 1.0 / self.norm_factor(integral, x, y);

        for (index, stage) in self.stages.iter().enumerate() {
            let score: f64 = stage
                .trees
                .iter()
                .map(|tree| self.tree_leaf(tree, integral, x, y, inv_norm))
                .sum();
            if score < stage.threshold {
                return Verdict::RejectedAt(index);
            }
        }
        Verdict::Accepted
    }

    /// Standard deviation term over the window interior, scaled by its area.
    fn norm_factor(&self, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        let (w, h) = (self.window_width - 2, self.window_height - 2);
        let sum = integral.rect_sum(x + 1, y + 1, w, h) as f64;
        let sq_sum = integral.rect_sq_sum(x + 1, y + 1, w, h) as f64;
        let nf = (w * h) as f64 * sq_sum - sum * sum;
        if nf > 0.0 {
            nf.sqrt()
        } else {
            1.0
        }
    }

    fn tree_leaf(
        &self,
        tree: &WeakTree,
        integral: &IntegralImage,
        x: u32,
        y: u32,
        inv_norm: f64,
    ) -> f64 {
        let mut idx: i32 = 0;
        loop {
            let node = &tree.nodes[idx as usize];
            let value = self.feature_value(node.feature, integral, x, y) * inv_norm;
            idx = if value < node.threshold {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return tree.leaves[(-idx) as usize];
            }
        }
    }

    fn feature_value(&self, feature: usize, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        self.features[feature]
            .rects
            .iter()
            .map(|r| r.weight * integral.rect_sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum()
    }

    fn check_consistency(&self) -> Result<(), CascadeError> {
        if self.stages.is_empty() {
            return Err(CascadeError::Malformed("no stages".into()));
        }
        for (fi, feature) in self.features.iter().enumerate() {
            for r in &feature.rects {
                if r.x + r.width > self.window_width || r.y + r.height > self.window_height {
                    return Err(CascadeError::Malformed(format!(
                        "feature {fi} rect ({} {} {} {}) exceeds the window",
                        r.x, r.y, r.width, r.height
                    )));
                }
            }
        }
        for (si, stage) in self.stages.iter().enumerate() {
            for tree in &stage.trees {
                for node in &tree.nodes {
                    if node.feature >= self.features.len() {
                        return Err(CascadeError::Malformed(format!(
                            "stage {si} references missing feature {}",
                            node.feature
                        )));
                    }
                    for child in [node.left, node.right] {
                        let in_range = if child > 0 {
                            (child as usize) < tree.nodes.len()
                        } else {
                            ((-child) as usize) < tree.leaves.len()
                        };
                        if !in_range {
                            return Err(CascadeError::Malformed(format!(
                                "stage {si} has a dangling tree index {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// ── XML helpers ──────────────────────────────────────────────────────

fn child<'a, 'i>(node: Node<'a, 'i>, name: &'static str) -> Result<Node<'a, 'i>, CascadeError> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .ok_or(CascadeError::MissingElement(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &'static str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
        .map(str::trim)
}

/// OpenCV storage lists encode each entry as an `<_>` element.
fn items<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(|c| c.has_tag_name("_"))
}

fn parse_child<T: FromStr>(node: Node<'_, '_>, name: &'static str) -> Result<T, CascadeError> {
    let text = child_text(node, name).ok_or(CascadeError::MissingElement(name))?;
    text.parse()
        .map_err(|_| CascadeError::Malformed(format!("<{name}> is not a number: {text:?}")))
}

fn parse_numbers<T: FromStr>(text: &str, what: &str) -> Result<Vec<T>, CascadeError> {
    text.split_whitespace()
        .map(|tok| {
            tok.parse()
                .map_err(|_| CascadeError::Malformed(format!("bad number {tok:?} in {what}")))
        })
        .collect()
}

fn parse_feature(node: Node<'_, '_>) -> Result<HaarFeature, CascadeError> {
    if child_text(node, "tilted").is_some_and(|t| t != "0") {
        return Err(CascadeError::Unsupported("tilted Haar features".into()));
    }

    let rects = items(child(node, "rects")?)
        .map(|r| {
            let values: Vec<f64> = parse_numbers(r.text().unwrap_or(""), "feature rect")?;
            let [x, y, w, h, weight] = values[..] else {
                return Err(CascadeError::Malformed(format!(
                    "feature rect needs 5 values, got {}",
                    values.len()
                )));
            };
            if x < 0.0 || y < 0.0 || w < 0.0 || h < 0.0 {
                return Err(CascadeError::Malformed("negative feature rect".into()));
            }
            Ok(WeightedRect {
                x: x as u32,
                y: y as u32,
                width: w as u32,
                height: h as u32,
                weight,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !(2..=3).contains(&rects.len()) {
        return Err(CascadeError::Malformed(format!(
            "Haar feature needs 2 or 3 rects, got {}",
            rects.len()
        )));
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: Node<'_, '_>) -> Result<Stage, CascadeError> {
    let threshold: f64 = parse_child(node, "stageThreshold")?;
    let trees = items(child(node, "weakClassifiers")?)
        .map(parse_tree)
        .collect::<Result<Vec<_>, _>>()?;
    if trees.is_empty() {
        return Err(CascadeError::Malformed("stage without weak classifiers".into()));
    }
    Ok(Stage {
        threshold: threshold - THRESHOLD_EPS,
        trees,
    })
}

fn parse_tree(node: Node<'_, '_>) -> Result<WeakTree, CascadeError> {
    let raw: Vec<f64> = parse_numbers(
        child_text(node, "internalNodes").ok_or(CascadeError::MissingElement("internalNodes"))?,
        "internalNodes",
    )?;
    let leaves: Vec<f64> = parse_numbers(
        child_text(node, "leafValues").ok_or(CascadeError::MissingElement("leafValues"))?,
        "leafValues",
    )?;

    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(CascadeError::Malformed(format!(
            "internalNodes needs groups of 4 values, got {}",
            raw.len()
        )));
    }
    let nodes: Vec<TreeNode> = raw
        .chunks_exact(4)
        .map(|n| TreeNode {
            left: n[0] as i32,
            right: n[1] as i32,
            feature: n[2].max(0.0) as usize,
            threshold: n[3],
        })
        .collect();
    if leaves.len() != nodes.len() + 1 {
        return Err(CascadeError::Malformed(format!(
            "{} nodes need {} leaves, got {}",
            nodes.len(),
            nodes.len() + 1,
            leaves.len()
        )));
    }
    Ok(WeakTree { nodes, leaves })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::GrayImage;

    /// One-stage 24x24 cascade that fires on a bright 12x12 center against a
    /// dark surround: `4 * center - whole`, normalized, must reach 0.5.
    pub(crate) const CENTER_SPOT_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>24</height>
  <width>24</width>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 24 24 -1.</_>
        <_>
          6 6 12 12 4.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    fn with_second_stage(threshold: &str) -> String {
        CENTER_SPOT_CASCADE.replace(
            "</stages>",
            &format!(
                "<_><maxWeakCount>1</maxWeakCount><stageThreshold>{threshold}</stageThreshold>\
                 <weakClassifiers><_><internalNodes>0 -1 0 0.5</internalNodes>\
                 <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>"
            ),
        )
    }

    fn spot_window(background: u8, spot: u8) -> IntegralImage {
        let gray = GrayImage::from_fn(24, 24, |x, y| {
            let inside = (6..18).contains(&x) && (6..18).contains(&y);
            image::Luma([if inside { spot } else { background }])
        });
        IntegralImage::new(&gray)
    }

    #[test]
    fn test_parses_structure() {
        let model = CascadeModel::from_xml(CENTER_SPOT_CASCADE).unwrap();
        assert_eq!(model.window_size(), (24, 24));
        assert_eq!(model.stage_count(), 1);
        assert_eq!(model.feature_count(), 1);
        assert_eq!(model.features[0].rects[1].weight, 4.0);
        assert_eq!(model.stages[0].trees[0].leaves, vec![-1.0, 1.0]);
        assert!(model.stages[0].threshold < 0.0);
    }

    #[test]
    fn test_bright_center_is_accepted() {
        let model = CascadeModel::from_xml(CENTER_SPOT_CASCADE).unwrap();
        assert_eq!(model.evaluate(&spot_window(0, 255), 0, 0), Verdict::Accepted);
    }

    #[test]
    fn test_uniform_window_is_rejected_at_first_stage() {
        let model = CascadeModel::from_xml(CENTER_SPOT_CASCADE).unwrap();
        assert_eq!(
            model.evaluate(&spot_window(128, 128), 0, 0),
            Verdict::RejectedAt(0)
        );
    }

    #[test]
    fn test_dark_center_is_rejected() {
        let model = CascadeModel::from_xml(CENTER_SPOT_CASCADE).unwrap();
        assert_eq!(
            model.evaluate(&spot_window(255, 0), 0, 0),
            Verdict::RejectedAt(0)
        );
    }

    #[test]
    fn test_rejection_reports_failing_stage() {
        let model = CascadeModel::from_xml(&with_second_stage("5.")).unwrap();
        assert_eq!(model.stage_count(), 2);
        assert_eq!(
            model.evaluate(&spot_window(0, 255), 0, 0),
            Verdict::RejectedAt(1)
        );
    }

    #[test]
    fn test_from_file_reads_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.xml");
        fs::write(&path, CENTER_SPOT_CASCADE).unwrap();
        assert_eq!(
            CascadeModel::from_file(&path).unwrap().window_size(),
            (24, 24)
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CascadeModel::from_file(Path::new("/nonexistent/cascade.xml")).unwrap_err();
        assert!(matches!(err, CascadeError::Io { .. }));
    }

    #[test]
    fn test_invalid_xml_rejected() {
        let err = CascadeModel::from_xml("<opencv_storage><cascade>").unwrap_err();
        assert!(matches!(err, CascadeError::Xml(_)));
    }

    #[test]
    fn test_missing_cascade_element_rejected() {
        let err = CascadeModel::from_xml("<opencv_storage/>").unwrap_err();
        assert!(matches!(err, CascadeError::MissingElement("cascade")));
    }

    #[test]
    fn test_lbp_cascade_unsupported() {
        let xml = CENTER_SPOT_CASCADE.replace(">HAAR<", ">LBP<");
        let err = CascadeModel::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[test]
    fn test_tilted_feature_unsupported() {
        let xml = CENTER_SPOT_CASCADE.replace("</rects>", "</rects><tilted>1</tilted>");
        let err = CascadeModel::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[test]
    fn test_rect_outside_window_rejected() {
        let xml = CENTER_SPOT_CASCADE.replace("6 6 12 12 4.", "16 16 12 12 4.");
        let err = CascadeModel::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CascadeError::Malformed(_)));
    }

    #[test]
    fn test_missing_feature_reference_rejected() {
        let xml = CENTER_SPOT_CASCADE.replace("0 -1 0 5.0000000000000000e-01", "0 -1 3 0.5");
        let err = CascadeModel::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CascadeError::Malformed(_)));
    }

    #[test]
    fn test_leaf_count_mismatch_rejected() {
        let xml = CENTER_SPOT_CASCADE.replace("-1. 1.</leafValues>", "-1.</leafValues>");
        let err = CascadeModel::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CascadeError::Malformed(_)));
    }
}
