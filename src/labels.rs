//! Class vocabulary.
//!
//! Detectors report a label and optionally an index into a fixed, closed list
//! of class names. The list is carried as an immutable value and handed to
//! whatever needs label/index lookup; there is no process-wide table.

use std::sync::Arc;

/// COCO-80 names, in model output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Immutable, cheaply clonable list of class names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassVocabulary {
    names: Arc<[String]>,
}

impl ClassVocabulary {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Case-insensitive label lookup.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(label))
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_lookup() {
        let vocab = ClassVocabulary::coco();
        assert_eq!(vocab.len(), 80);
        assert_eq!(vocab.index_of("train"), Some(6));
        assert_eq!(vocab.index_of("Train"), Some(6));
        assert_eq!(vocab.name(6), Some("train"));
        assert_eq!(vocab.index_of("tram"), None);
        assert_eq!(vocab.name(80), None);
    }

    #[test]
    fn custom_vocabulary() {
        let vocab = ClassVocabulary::new(["locomotive", "wagon"]);
        assert_eq!(vocab.index_of("wagon"), Some(1));
        assert_eq!(vocab.iter().collect::<Vec<_>>(), vec!["locomotive", "wagon"]);
    }
}
