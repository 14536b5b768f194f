//! Tracking-readiness scoring
//!
//! Pure functions - NO IO. `finalize_scan` feeds a completed scan's pages
//! and recommendations through here and persists whatever comes back.

use crate::common::PageId;
use crate::domains::recommendation::models::{Recommendation, Severity};
use crate::domains::scan::models::{Page, PageType, SeverityCounts};

/// Everything the scoring pass produces for one scan.
#[derive(Debug, Clone)]
pub struct ScanScore {
    pub readiness_score: i32,
    pub narrative: String,
    pub severity_counts: SeverityCounts,
    pub page_scores: Vec<(PageId, f64)>,
}

/// Score a completed scan: readiness, narrative, and per-page importance.
pub fn score_scan(pages: &[Page], recommendations: &[Recommendation]) -> ScanScore {
    let severity_counts = count_severities(recommendations);
    let readiness_score = readiness_score(&severity_counts);
    let narrative = readiness_narrative(&severity_counts, recommendations.len(), readiness_score);
    let page_scores = pages
        .iter()
        .map(|page| (page.id, page_importance(page, recommendations)))
        .collect();

    ScanScore {
        readiness_score,
        narrative,
        severity_counts,
        page_scores,
    }
}

/// Count recommendations per severity bucket.
pub fn count_severities(recommendations: &[Recommendation]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for rec in recommendations {
        match rec.severity {
            Severity::Critical => counts.critical += 1,
            Severity::Important => counts.important += 1,
            Severity::Recommended => counts.recommended += 1,
            Severity::Optional => counts.optional += 1,
        }
    }
    counts
}

/// Readiness score on a 0-100 scale.
///
/// Each severity bucket contributes with diminishing returns and its own
/// cap, so critical gaps dominate but no single bucket can max the score.
pub fn readiness_score(counts: &SeverityCounts) -> i32 {
    let critical = (counts.critical * 10).min(40);
    let important = (counts.important * 6).min(30);
    let recommended = (counts.recommended * 4).min(20);
    let optional = (counts.optional * 2).min(10);

    (critical + important + recommended + optional).min(100) as i32
}

/// One-sentence summary of the scan's tracking opportunity.
pub fn readiness_narrative(counts: &SeverityCounts, total: usize, score: i32) -> String {
    let mut clauses: Vec<String> = Vec::new();
    if counts.critical > 0 {
        clauses.push(format!(
            "{} critical tracking gap{}",
            counts.critical,
            plural(counts.critical)
        ));
    }
    if counts.important > 0 {
        clauses.push(format!(
            "{} important improvement{}",
            counts.important,
            plural(counts.important)
        ));
    }
    clauses.push(format!(
        "{} total recommendation{}",
        total,
        plural(total as u32)
    ));

    let quality = if score >= 80 {
        "Excellent tracking potential across this site."
    } else if score >= 60 {
        "Good tracking potential across this site."
    } else if score >= 40 {
        "Moderate tracking potential across this site."
    } else {
        "Basic tracking potential across this site."
    };

    format!("Found {}. {}", clauses.join(", "), quality)
}

fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Base weight per page-type classification. Commerce funnel pages score
/// highest; informational pages lowest; unclassified pages get a low
/// default.
fn base_weight(page_type: PageType) -> f64 {
    match page_type {
        PageType::Checkout => 1.0,
        PageType::Cart => 0.95,
        PageType::Pricing => 0.9,
        PageType::Contact => 0.85,
        PageType::Landing => 0.8,
        PageType::Product => 0.75,
        PageType::Homepage => 0.7,
        PageType::Category => 0.55,
        PageType::About => 0.4,
        PageType::Blog => 0.3,
        PageType::Faq => 0.25,
        PageType::Legal => 0.15,
        PageType::Unknown => 0.3,
    }
}

/// Importance of one page in [0, 1].
///
/// Base weight for the page type, fixed bonuses per interaction signal, a
/// bonus per critical/important recommendation targeting the page, then a
/// link-depth penalty and a final clamp.
pub fn page_importance(page: &Page, recommendations: &[Recommendation]) -> f64 {
    let mut score = base_weight(page.page_type);

    if page.has_form {
        score += 0.10;
    }
    if page.has_cta {
        score += 0.08;
    }
    if page.has_phone_link {
        score += 0.05;
    }
    if page.has_email_link {
        score += 0.05;
    }

    for rec in recommendations {
        let Some(rec_url) = rec.page_url.as_deref() else {
            continue;
        };
        if !urls_match(&page.url, rec_url) {
            continue;
        }
        match rec.severity {
            Severity::Critical => score += 0.15,
            Severity::Important => score += 0.08,
            Severity::Recommended | Severity::Optional => {}
        }
    }

    let depth_factor = (1.0 - page.link_depth as f64 * 0.1).max(0.0);
    (score * depth_factor).clamp(0.0, 1.0)
}

/// Compare two page URLs, tolerating scheme/host casing and a trailing
/// slash. Unparseable URLs fall back to exact string comparison.
fn urls_match(a: &str, b: &str) -> bool {
    match (url::Url::parse(a), url::Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.host_str().map(str::to_lowercase) == b.host_str().map(str::to_lowercase)
                && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
                && a.query() == b.query()
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RecommendationId, ScanId};
    use crate::domains::recommendation::models::RecommendationStatus;
    use chrono::Utc;

    fn page(page_type: PageType, url: &str, depth: i32) -> Page {
        Page {
            id: PageId::new(),
            scan_id: ScanId::new(),
            url: url.to_string(),
            page_type,
            link_depth: depth,
            has_form: false,
            has_cta: false,
            has_phone_link: false,
            has_email_link: false,
            importance_score: None,
            created_at: Utc::now(),
        }
    }

    fn recommendation(severity: Severity, page_url: Option<&str>) -> Recommendation {
        Recommendation {
            id: RecommendationId::new(),
            scan_id: ScanId::new(),
            page_url: page_url.map(String::from),
            name: "Track checkout".to_string(),
            tracking_type: "begin_checkout".to_string(),
            severity,
            suggested_destinations: vec!["gtm".to_string()],
            suggested_event_name: None,
            suggested_selector: None,
            selector_confidence: None,
            status: RecommendationStatus::Pending,
            tracking_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn counts(critical: u32, important: u32, recommended: u32, optional: u32) -> SeverityCounts {
        SeverityCounts {
            critical,
            important,
            recommended,
            optional,
        }
    }

    // ------------------------------------------------------------------
    // Readiness score
    // ------------------------------------------------------------------

    #[test]
    fn test_readiness_empty_scan_is_zero() {
        assert_eq!(readiness_score(&counts(0, 0, 0, 0)), 0);
    }

    #[test]
    fn test_readiness_buckets_are_capped() {
        // 5 critical caps at 40 (not 50); 2 important add 12
        assert_eq!(readiness_score(&counts(5, 2, 0, 0)), 52);
        // Per-bucket caps: 40 + 30 + 20 + 10
        assert_eq!(readiness_score(&counts(100, 100, 100, 100)), 100);
        assert_eq!(readiness_score(&counts(0, 100, 0, 0)), 30);
        assert_eq!(readiness_score(&counts(0, 0, 100, 0)), 20);
        assert_eq!(readiness_score(&counts(0, 0, 0, 100)), 10);
    }

    #[test]
    fn test_readiness_never_exceeds_100() {
        assert_eq!(readiness_score(&counts(4, 5, 5, 5)), 100);
    }

    #[test]
    fn test_readiness_single_bucket_cannot_max_score() {
        assert!(readiness_score(&counts(1000, 0, 0, 0)) < 100);
    }

    // ------------------------------------------------------------------
    // Narrative
    // ------------------------------------------------------------------

    #[test]
    fn test_narrative_includes_counts_and_quality() {
        let narrative = readiness_narrative(&counts(5, 2, 0, 0), 7, 52);
        assert_eq!(
            narrative,
            "Found 5 critical tracking gaps, 2 important improvements, \
             7 total recommendations. Moderate tracking potential across this site."
        );
    }

    #[test]
    fn test_narrative_omits_empty_buckets() {
        let narrative = readiness_narrative(&counts(0, 0, 3, 0), 3, 12);
        assert_eq!(
            narrative,
            "Found 3 total recommendations. Basic tracking potential across this site."
        );
    }

    #[test]
    fn test_narrative_singular_forms() {
        let narrative = readiness_narrative(&counts(1, 1, 0, 0), 1, 16);
        assert!(narrative.contains("1 critical tracking gap,"));
        assert!(narrative.contains("1 important improvement,"));
        assert!(narrative.contains("1 total recommendation."));
    }

    #[test]
    fn test_narrative_quality_thresholds() {
        assert!(readiness_narrative(&counts(0, 0, 0, 0), 0, 80).contains("Excellent"));
        assert!(readiness_narrative(&counts(0, 0, 0, 0), 0, 79).contains("Good"));
        assert!(readiness_narrative(&counts(0, 0, 0, 0), 0, 60).contains("Good"));
        assert!(readiness_narrative(&counts(0, 0, 0, 0), 0, 59).contains("Moderate"));
        assert!(readiness_narrative(&counts(0, 0, 0, 0), 0, 40).contains("Moderate"));
        assert!(readiness_narrative(&counts(0, 0, 0, 0), 0, 39).contains("Basic"));
    }

    // ------------------------------------------------------------------
    // Page importance
    // ------------------------------------------------------------------

    #[test]
    fn test_importance_clamps_to_one() {
        // Checkout base 1.0 + all four signals + two critical
        // recommendations at depth 0 still clamps to exactly 1.0
        let mut p = page(PageType::Checkout, "https://shop.test/checkout", 0);
        p.has_form = true;
        p.has_cta = true;
        p.has_phone_link = true;
        p.has_email_link = true;
        let recs = vec![
            recommendation(Severity::Critical, Some("https://shop.test/checkout")),
            recommendation(Severity::Critical, Some("https://shop.test/checkout")),
        ];
        assert_eq!(page_importance(&p, &recs), 1.0);
    }

    #[test]
    fn test_importance_never_negative() {
        let p = page(PageType::Legal, "https://shop.test/terms", 15);
        assert_eq!(page_importance(&p, &[]), 0.0);
    }

    #[test]
    fn test_importance_depth_penalty() {
        let shallow = page(PageType::Pricing, "https://shop.test/pricing", 0);
        let deep = page(PageType::Pricing, "https://shop.test/a/b/pricing", 3);
        assert!(page_importance(&shallow, &[]) > page_importance(&deep, &[]));
        // Depth 3 multiplies by 0.7
        assert!((page_importance(&deep, &[]) - 0.9 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_importance_signal_bonuses() {
        let plain = page(PageType::Blog, "https://shop.test/blog", 0);
        let mut with_form = plain.clone();
        with_form.has_form = true;
        assert!((page_importance(&with_form, &[]) - page_importance(&plain, &[]) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_importance_targeting_recommendations_add_weight() {
        let p = page(PageType::Blog, "https://shop.test/blog/signup", 0);
        let critical = recommendation(Severity::Critical, Some("https://shop.test/blog/signup"));
        let important = recommendation(Severity::Important, Some("https://shop.test/blog/signup"));
        let elsewhere = recommendation(Severity::Critical, Some("https://shop.test/other"));
        let untargeted = recommendation(Severity::Critical, None);

        let base = page_importance(&p, &[]);
        let scored = page_importance(&p, &[critical, important, elsewhere, untargeted]);
        assert!((scored - base - 0.15 - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_importance_lower_severities_add_nothing() {
        let p = page(PageType::Blog, "https://shop.test/blog", 0);
        let recs = vec![
            recommendation(Severity::Recommended, Some("https://shop.test/blog")),
            recommendation(Severity::Optional, Some("https://shop.test/blog")),
        ];
        assert_eq!(page_importance(&p, &recs), page_importance(&p, &[]));
    }

    #[test]
    fn test_urls_match_tolerates_trailing_slash_and_case() {
        assert!(urls_match(
            "https://Shop.Test/checkout/",
            "https://shop.test/checkout"
        ));
        assert!(!urls_match(
            "https://shop.test/checkout",
            "https://shop.test/cart"
        ));
        // Unparseable falls back to string equality
        assert!(urls_match("/checkout", "/checkout"));
        assert!(!urls_match("/checkout", "/cart"));
    }

    // ------------------------------------------------------------------
    // score_scan
    // ------------------------------------------------------------------

    #[test]
    fn test_score_scan_assembles_all_outputs() {
        let pages = vec![
            page(PageType::Checkout, "https://shop.test/checkout", 1),
            page(PageType::Blog, "https://shop.test/blog", 2),
        ];
        let recs = vec![
            recommendation(Severity::Critical, Some("https://shop.test/checkout")),
            recommendation(Severity::Important, None),
            recommendation(Severity::Optional, None),
        ];

        let score = score_scan(&pages, &recs);
        assert_eq!(score.severity_counts, counts(1, 1, 0, 1));
        assert_eq!(score.readiness_score, 10 + 6 + 2);
        assert_eq!(score.page_scores.len(), 2);
        assert!(score.narrative.contains("3 total recommendations"));
        for (_, importance) in &score.page_scores {
            assert!((0.0..=1.0).contains(importance));
        }
    }
}
