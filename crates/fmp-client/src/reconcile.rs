use evaluation_core::{CompanyProfile, Freshness, KeyMetrics, StockQuote};

/// Reported market cap may disagree with price * shares by this fraction
/// before we override it.
const MKT_CAP_TOLERANCE: f64 = 0.05;

fn present(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x != 0.0)
}

/// Derive shares outstanding from market cap and price when the upstream
/// reports zero shares.
pub(crate) fn derive_shares(profile: &mut CompanyProfile) {
    if present(profile.shares_outstanding).is_some() {
        return;
    }
    if let (Some(price), Some(cap)) = (present(profile.price), present(profile.mkt_cap)) {
        profile.shares_outstanding = Some(cap / price);
        profile.reconciliation.shares_calculated = true;
    }
}

/// Replace the reported market cap with price * shares when the discrepancy
/// exceeds the tolerance.
pub(crate) fn correct_market_cap(profile: &mut CompanyProfile) {
    let (Some(price), Some(shares)) = (present(profile.price), present(profile.shares_outstanding))
    else {
        return;
    };
    let computed = price * shares;
    if computed == 0.0 {
        return;
    }
    if let Some(reported) = present(profile.mkt_cap) {
        if ((reported - computed).abs() / computed) > MKT_CAP_TOLERANCE {
            profile.mkt_cap = Some(computed);
            profile.reconciliation.mkt_cap_calculated = true;
        }
    }
}

/// Whether the profile still needs a supplementary quote fetch.
pub(crate) fn needs_quote_backfill(profile: &CompanyProfile) -> bool {
    present(profile.price).is_none() || present(profile.shares_outstanding).is_none()
}

/// Backfill price and shares outstanding from a real-time quote.
pub(crate) fn backfill_from_quote(profile: &mut CompanyProfile, quote: &StockQuote) {
    let mut used = false;
    if present(profile.price).is_none() {
        if let Some(price) = present(quote.price) {
            profile.price = Some(price);
            used = true;
        }
    }
    if present(profile.shares_outstanding).is_none() {
        if let Some(shares) = present(quote.shares_outstanding) {
            profile.shares_outstanding = Some(shares);
            used = true;
        }
    }
    if used {
        profile.reconciliation.price_from_quote = true;
    }
}

/// Whether the profile still needs a supplementary key-metrics fetch.
pub(crate) fn needs_metrics_backfill(profile: &CompanyProfile) -> bool {
    present(profile.mkt_cap).is_none()
}

/// Backfill market cap from the most recent key-metrics entry.
pub(crate) fn backfill_from_metrics(profile: &mut CompanyProfile, metrics: &KeyMetrics) {
    if present(profile.mkt_cap).is_none() {
        if let Some(cap) = present(metrics.market_cap) {
            profile.mkt_cap = Some(cap);
            profile.reconciliation.mkt_cap_from_metrics = true;
        }
    }
}

/// A profile is fresh only when both critical fields survived the fetch.
pub(crate) fn profile_freshness(profile: &CompanyProfile) -> Freshness {
    if present(profile.mkt_cap).is_some() && !profile.company_name.is_empty() {
        Freshness::Fresh
    } else {
        Freshness::Fallback
    }
}

/// Metrics are fresh when the latest entry carries market cap and
/// revenue per share.
pub(crate) fn metrics_freshness(metrics: &KeyMetrics) -> Freshness {
    if present(metrics.market_cap).is_some() && present(metrics.revenue_per_share).is_some() {
        Freshness::Fresh
    } else {
        Freshness::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(price: f64, shares: f64, cap: f64) -> CompanyProfile {
        CompanyProfile {
            symbol: "TEST".into(),
            company_name: "Test Corp".into(),
            price: Some(price),
            shares_outstanding: Some(shares),
            mkt_cap: Some(cap),
            ..Default::default()
        }
    }

    #[test]
    fn derives_shares_from_cap_and_price() {
        let mut p = profile(150.0, 0.0, 3_000_000_000.0);
        derive_shares(&mut p);
        assert_eq!(p.shares_outstanding, Some(20_000_000.0));
        assert!(p.reconciliation.shares_calculated);
    }

    #[test]
    fn leaves_reported_shares_alone() {
        let mut p = profile(150.0, 1_000_000.0, 150_000_000.0);
        derive_shares(&mut p);
        assert_eq!(p.shares_outstanding, Some(1_000_000.0));
        assert!(!p.reconciliation.shares_calculated);
    }

    #[test]
    fn corrects_market_cap_past_tolerance() {
        // Reported cap is 50% off the computed value.
        let mut p = profile(100.0, 1_000_000.0, 150_000_000.0);
        correct_market_cap(&mut p);
        assert_eq!(p.mkt_cap, Some(100_000_000.0));
        assert!(p.reconciliation.mkt_cap_calculated);
    }

    #[test]
    fn keeps_market_cap_within_tolerance() {
        // 3% off: inside the 5% tolerance.
        let mut p = profile(100.0, 1_000_000.0, 103_000_000.0);
        correct_market_cap(&mut p);
        assert_eq!(p.mkt_cap, Some(103_000_000.0));
        assert!(!p.reconciliation.mkt_cap_calculated);
    }

    #[test]
    fn quote_backfills_missing_price() {
        let mut p = profile(0.0, 1_000_000.0, 100_000_000.0);
        assert!(needs_quote_backfill(&p));
        let quote = StockQuote {
            price: Some(99.5),
            ..Default::default()
        };
        backfill_from_quote(&mut p, &quote);
        assert_eq!(p.price, Some(99.5));
        assert!(p.reconciliation.price_from_quote);
        assert!(!needs_quote_backfill(&p));
    }

    #[test]
    fn metrics_backfill_missing_market_cap() {
        let mut p = profile(100.0, 1_000_000.0, 0.0);
        assert!(needs_metrics_backfill(&p));
        let metrics = KeyMetrics {
            market_cap: Some(100_000_000.0),
            ..Default::default()
        };
        backfill_from_metrics(&mut p, &metrics);
        assert_eq!(p.mkt_cap, Some(100_000_000.0));
        assert!(p.reconciliation.mkt_cap_from_metrics);
    }

    #[test]
    fn freshness_requires_both_critical_fields() {
        let mut p = profile(100.0, 1_000_000.0, 100_000_000.0);
        assert_eq!(profile_freshness(&p), Freshness::Fresh);

        p.company_name.clear();
        assert_eq!(profile_freshness(&p), Freshness::Fallback);

        p.company_name = "Test Corp".into();
        p.mkt_cap = Some(0.0);
        assert_eq!(profile_freshness(&p), Freshness::Fallback);
    }

    #[test]
    fn metrics_freshness_requires_cap_and_revenue_per_share() {
        let m = KeyMetrics {
            market_cap: Some(1.0e9),
            revenue_per_share: Some(12.5),
            ..Default::default()
        };
        assert_eq!(metrics_freshness(&m), Freshness::Fresh);

        let m = KeyMetrics {
            market_cap: Some(1.0e9),
            revenue_per_share: None,
            ..Default::default()
        };
        assert_eq!(metrics_freshness(&m), Freshness::Fallback);
    }
}
