//! Detection verification.
//!
//! Cross-references the semantic analyzer's free-text product list against
//! the detector's fixed-vocabulary class labels: product names are broken
//! into keyword tokens and a detection verifies a product when its class
//! label and one of the product's keywords contain each other.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

use fscope_models::{Detection, Product, VerifiedDetection};

/// A detection rejected as malformed, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDetection {
    pub frame_index: u64,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum VerifierError {
    /// One or more detections were malformed. Every rejection is listed;
    /// nothing is silently swallowed.
    #[error("{} invalid detection(s), first: frame {} ({})",
        .0.len(),
        .0.first().map(|r| r.frame_index).unwrap_or_default(),
        .0.first().map(|r| r.reason.as_str()).unwrap_or(""))]
    InvalidDetection(Vec<RejectedDetection>),
}

/// Output of a verification pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    /// Every input detection, grouped by frame, annotated with the
    /// products it verifies (possibly none)
    pub verified: BTreeMap<u64, Vec<VerifiedDetection>>,

    /// Raw detection count per class label, matched or not
    pub class_distribution: BTreeMap<String, u64>,

    /// Products confirmed by at least one detection
    pub verified_product_names: BTreeSet<String>,
}

/// Tokenize a product name into lower-cased keyword tokens.
///
/// Tokens of length <= 2 are discarded (stop-word-like filtering) and
/// duplicates within one product collapse. A product like "Ox" therefore
/// produces an empty keyword set and can never be matched; that filtering
/// is intentional.
fn product_keywords(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2)
        .map(str::to_string)
        .collect()
}

/// Symmetric substring containment: class labels are short single words
/// ("bowl") while product tokens may be compound ("dogbowl"), so either
/// side containing the other counts as a match.
fn keyword_matches(label: &str, keyword: &str) -> bool {
    label == keyword || keyword.contains(label) || label.contains(keyword)
}

/// Verify detections against a product list.
///
/// Fails with [`VerifierError::InvalidDetection`] when any detection has an
/// empty class label or a negative (or NaN) confidence; the error lists
/// every rejection so callers can choose to filter and continue. An empty
/// product list yields zero matches but still computes the class
/// distribution.
pub fn verify(
    products: &[Product],
    detections: &BTreeMap<u64, Vec<Detection>>,
) -> Result<VerificationReport, VerifierError> {
    let rejections = validate(detections);
    if !rejections.is_empty() {
        return Err(VerifierError::InvalidDetection(rejections));
    }

    let keywords: Vec<(&Product, BTreeSet<String>)> = products
        .iter()
        .map(|p| (p, product_keywords(&p.name)))
        .collect();

    debug!(
        products = products.len(),
        vocabulary = keywords.iter().map(|(_, k)| k.len()).sum::<usize>(),
        "verifying detections against product keywords"
    );

    let mut report = VerificationReport::default();

    for (&frame_index, frame_detections) in detections {
        let mut annotated = Vec::with_capacity(frame_detections.len());

        for detection in frame_detections {
            let label = detection.class_label.to_lowercase();
            *report
                .class_distribution
                .entry(detection.class_label.clone())
                .or_insert(0) += 1;

            // A detection may verify more than one product; there is no
            // single-winner tie-break.
            let mut matched_products = Vec::new();
            for (product, tokens) in &keywords {
                if tokens.iter().any(|kw| keyword_matches(&label, kw)) {
                    matched_products.push(product.name.clone());
                    report.verified_product_names.insert(product.name.clone());
                }
            }

            annotated.push(VerifiedDetection {
                detection: detection.clone(),
                matched_products,
            });
        }

        report.verified.insert(frame_index, annotated);
    }

    Ok(report)
}

fn validate(detections: &BTreeMap<u64, Vec<Detection>>) -> Vec<RejectedDetection> {
    let mut rejections = Vec::new();
    for (&frame_index, frame_detections) in detections {
        for detection in frame_detections {
            if detection.class_label.trim().is_empty() {
                rejections.push(RejectedDetection {
                    frame_index,
                    reason: "missing class label".into(),
                });
            }
            if detection.confidence.is_nan() || detection.confidence < 0.0 {
                rejections.push(RejectedDetection {
                    frame_index,
                    reason: format!("negative confidence {}", detection.confidence),
                });
            }
        }
    }
    rejections
}

#[cfg(test)]
mod tests {
    use super::*;
    use fscope_models::BBox;

    fn product(name: &str) -> Product {
        Product {
            name: name.into(),
            category: "container".into(),
            first_seen_ts: 0.0,
            last_seen_ts: 10.0,
        }
    }

    fn detection(frame: u64, label: &str, confidence: f64) -> Detection {
        Detection::new(frame, label, confidence, BBox::new(0.0, 0.0, 10.0, 10.0))
    }

    fn by_frame(dets: Vec<Detection>) -> BTreeMap<u64, Vec<Detection>> {
        let mut map: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for d in dets {
            map.entry(d.frame_index).or_default().push(d);
        }
        map
    }

    #[test]
    fn test_tokenization() {
        let tokens = product_keywords("GOODBOY GRAVIES");
        assert_eq!(
            tokens,
            ["goodboy", "gravies"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn test_short_tokens_filtered() {
        assert!(product_keywords("Ox").is_empty());
        assert!(product_keywords("a b cd").is_empty());
    }

    #[test]
    fn test_substring_containment_verifies() {
        // "Dog Bowl" -> {"dog", "bowl"}; label "bowl" equals a keyword.
        let report = verify(
            &[product("Dog Bowl")],
            &by_frame(vec![detection(0, "bowl", 0.9)]),
        )
        .unwrap();

        assert!(report.verified_product_names.contains("Dog Bowl"));
        assert!(report.verified[&0][0].is_verified());
    }

    #[test]
    fn test_compound_keyword_matches_short_label() {
        // keyword "dogbowl" contains label "bowl"
        let report = verify(
            &[product("DogBowl")],
            &by_frame(vec![detection(0, "bowl", 0.9)]),
        )
        .unwrap();
        assert!(report.verified_product_names.contains("DogBowl"));
    }

    #[test]
    fn test_filtered_product_never_matches() {
        let report = verify(&[product("Ox")], &by_frame(vec![detection(0, "ox", 0.9)])).unwrap();
        assert!(report.verified_product_names.is_empty());
        assert!(!report.verified[&0][0].is_verified());
    }

    #[test]
    fn test_detection_can_verify_multiple_products() {
        let report = verify(
            &[product("Dog Bowl"), product("Soup Bowl")],
            &by_frame(vec![detection(0, "bowl", 0.9)]),
        )
        .unwrap();
        assert_eq!(report.verified[&0][0].matched_products.len(), 2);
    }

    #[test]
    fn test_unmatched_detections_retained_in_distribution() {
        let report = verify(
            &[product("Dog Bowl")],
            &by_frame(vec![detection(0, "bowl", 0.9), detection(0, "chair", 0.7)]),
        )
        .unwrap();
        assert_eq!(report.class_distribution["chair"], 1);
        assert_eq!(report.class_distribution["bowl"], 1);
        assert!(!report.verified[&0][1].is_verified());
    }

    #[test]
    fn test_empty_product_list_still_counts_classes() {
        let report = verify(&[], &by_frame(vec![detection(2, "person", 0.8)])).unwrap();
        assert!(report.verified_product_names.is_empty());
        assert_eq!(report.class_distribution["person"], 1);
    }

    #[test]
    fn test_malformed_detections_all_reported() {
        let err = verify(
            &[],
            &by_frame(vec![detection(0, "", 0.9), detection(3, "bowl", -0.1)]),
        )
        .unwrap_err();

        let VerifierError::InvalidDetection(rejections) = err;
        assert_eq!(rejections.len(), 2);
        assert_eq!(rejections[0].frame_index, 0);
        assert_eq!(rejections[1].frame_index, 3);
    }
}
