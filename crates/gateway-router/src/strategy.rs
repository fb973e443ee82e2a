//! Pure ranking functions, one per [`RoutingStrategy`] variant.

use std::sync::atomic::{AtomicUsize, Ordering};

use gateway_core::error::GatewayError;
use gateway_provider::{HealthStatus, VendorTag};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::candidate::RoutingCandidate;
use crate::config::RoutingConfig;
use crate::context::RoutingContext;
use crate::decision::RoutingStrategy;

/// One candidate plus the score the active strategy assigned it. Ranked
/// lists are always best-first; for strategies with no natural notion of
/// "score" the value is purely an ordering aid and not documented as
/// meaningful (only `Scored` promises its additive formula).
pub struct RankedCandidate<'a> {
    pub candidate: &'a RoutingCandidate,
    pub score: f64,
}

fn cost_score(vendor_tag: VendorTag) -> f64 {
    match vendor_tag {
        VendorTag::Local => 100.0,
        VendorTag::Cloud => 20.0,
        VendorTag::Unknown => 50.0,
    }
}

fn health_score(health: HealthStatus) -> f64 {
    match health {
        HealthStatus::Healthy => 50.0,
        HealthStatus::Degraded => 25.0,
        HealthStatus::Unhealthy => 0.0,
    }
}

fn effective_weight(candidate: &RoutingCandidate, config: &RoutingConfig) -> f64 {
    config
        .weight_of(&candidate.provider_id)
        .unwrap_or(candidate.weight)
        .max(0.0)
}

fn scored_score(candidate: &RoutingCandidate, context: &RoutingContext, config: &RoutingConfig) -> f64 {
    let mut score = 0.0;

    if context.preferred_provider.as_deref() == Some(candidate.provider_id.as_str()) {
        score += 100.0;
    }
    score += health_score(candidate.health);
    if context.cost_sensitive && candidate.vendor_tag == VendorTag::Local {
        score += 30.0;
    }
    score += effective_weight(candidate, config) * 5.0;
    if (context.prefer_local || config.prefer_local()) && candidate.vendor_tag == VendorTag::Local
    {
        score += 20.0;
    }
    score += context.priority as f64;

    score.max(0.0)
}

fn sort_by_score_desc<'a>(mut ranked: Vec<RankedCandidate<'a>>) -> Vec<RankedCandidate<'a>> {
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Ranks `candidates` (already filtered by pool/exclusion/health) for
/// `strategy`, returning them best-first. Empty input yields empty output
/// rather than an error; the caller decides whether an empty candidate
/// set after filtering is itself an error.
pub fn rank<'a>(
    strategy: RoutingStrategy,
    candidates: &'a [RoutingCandidate],
    context: &RoutingContext,
    config: &RoutingConfig,
    round_robin_counter: &AtomicUsize,
) -> Result<Vec<RankedCandidate<'a>>, GatewayError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    match strategy {
        RoutingStrategy::RoundRobin => {
            let start = round_robin_counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
            let ranked = (0..candidates.len())
                .map(|offset| {
                    let idx = (start + offset) % candidates.len();
                    RankedCandidate {
                        candidate: &candidates[idx],
                        score: (candidates.len() - offset) as f64,
                    }
                })
                .collect();
            Ok(ranked)
        }

        RoutingStrategy::Random => {
            let mut indices: Vec<usize> = (0..candidates.len()).collect();
            indices.shuffle(&mut rand::rng());
            Ok(indices
                .into_iter()
                .map(|i| RankedCandidate {
                    candidate: &candidates[i],
                    score: 0.0,
                })
                .collect())
        }

        RoutingStrategy::WeightedRandom => {
            let mut remaining: Vec<usize> = (0..candidates.len()).collect();
            let mut order = Vec::with_capacity(candidates.len());
            let mut rng = rand::rng();

            while !remaining.is_empty() {
                let total: f64 = remaining
                    .iter()
                    .map(|&i| effective_weight(&candidates[i], config).max(f64::MIN_POSITIVE))
                    .sum();
                let mut pick = rng.random_range(0.0..total);
                let mut chosen_pos = remaining.len() - 1;
                for (pos, &i) in remaining.iter().enumerate() {
                    let w = effective_weight(&candidates[i], config).max(f64::MIN_POSITIVE);
                    if pick < w {
                        chosen_pos = pos;
                        break;
                    }
                    pick -= w;
                }
                order.push(remaining.remove(chosen_pos));
            }

            Ok(order
                .into_iter()
                .map(|i| RankedCandidate {
                    candidate: &candidates[i],
                    score: effective_weight(&candidates[i], config),
                })
                .collect())
        }

        RoutingStrategy::LeastLoaded => {
            let ranked = candidates
                .iter()
                .map(|c| RankedCandidate {
                    candidate: c,
                    score: -(c.active_requests as f64),
                })
                .collect();
            Ok(sort_by_score_desc(ranked))
        }

        RoutingStrategy::CostOptimized => {
            let ranked = candidates
                .iter()
                .map(|c| RankedCandidate {
                    candidate: c,
                    score: cost_score(c.vendor_tag),
                })
                .collect();
            Ok(sort_by_score_desc(ranked))
        }

        RoutingStrategy::LatencyOptimized => {
            let ranked = candidates
                .iter()
                .map(|c| RankedCandidate {
                    candidate: c,
                    score: -c.p95_latency.as_secs_f64(),
                })
                .collect();
            Ok(sort_by_score_desc(ranked))
        }

        RoutingStrategy::Failover => Ok(candidates
            .iter()
            .map(|c| RankedCandidate {
                candidate: c,
                score: 0.0,
            })
            .collect()),

        RoutingStrategy::Scored => {
            let ranked = candidates
                .iter()
                .map(|c| RankedCandidate {
                    candidate: c,
                    score: scored_score(c, context, config),
                })
                .collect();
            Ok(sort_by_score_desc(ranked))
        }

        RoutingStrategy::UserSelected => {
            let preferred = context.preferred_provider.as_ref().ok_or_else(|| {
                GatewayError::Validation {
                    message: "user_selected strategy requires a preferred provider".into(),
                }
            })?;

            let candidate = candidates
                .iter()
                .find(|c| &c.provider_id == preferred)
                .ok_or_else(|| GatewayError::Validation {
                    message: format!("preferred provider {preferred} is not a valid candidate"),
                })?;

            Ok(vec![RankedCandidate {
                candidate,
                score: 100.0,
            }])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::tenant::TenantId;

    fn candidates() -> Vec<RoutingCandidate> {
        vec![
            RoutingCandidate::new("local")
                .with_vendor_tag(VendorTag::Local)
                .with_weight(1.0)
                .with_active_requests(5)
                .with_p95_latency(std::time::Duration::from_millis(200)),
            RoutingCandidate::new("cloud")
                .with_vendor_tag(VendorTag::Cloud)
                .with_weight(1.0)
                .with_active_requests(1)
                .with_p95_latency(std::time::Duration::from_millis(50)),
        ]
    }

    fn ctx() -> RoutingContext {
        RoutingContext::new(TenantId::new("acme"))
    }

    #[test]
    fn round_robin_rotates_deterministically() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        let first = rank(RoutingStrategy::RoundRobin, &candidates, &ctx(), &config, &counter).unwrap();
        let second = rank(RoutingStrategy::RoundRobin, &candidates, &ctx(), &config, &counter).unwrap();

        assert_eq!(first[0].candidate.provider_id, "local");
        assert_eq!(second[0].candidate.provider_id, "cloud");
    }

    #[test]
    fn least_loaded_picks_the_minimum() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        let ranked = rank(RoutingStrategy::LeastLoaded, &candidates, &ctx(), &config, &counter).unwrap();
        assert_eq!(ranked[0].candidate.provider_id, "cloud");
    }

    #[test]
    fn cost_optimized_prefers_local() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        let ranked = rank(RoutingStrategy::CostOptimized, &candidates, &ctx(), &config, &counter).unwrap();
        assert_eq!(ranked[0].candidate.provider_id, "local");
    }

    #[test]
    fn latency_optimized_prefers_lowest_latency() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        let ranked =
            rank(RoutingStrategy::LatencyOptimized, &candidates, &ctx(), &config, &counter).unwrap();
        assert_eq!(ranked[0].candidate.provider_id, "cloud");
    }

    #[test]
    fn failover_preserves_input_order() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        let ranked = rank(RoutingStrategy::Failover, &candidates, &ctx(), &config, &counter).unwrap();
        assert_eq!(ranked[0].candidate.provider_id, "local");
        assert_eq!(ranked[1].candidate.provider_id, "cloud");
    }

    #[test]
    fn scored_rewards_preferred_provider() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);
        let context = ctx().with_preferred_provider("cloud");

        let ranked = rank(RoutingStrategy::Scored, &candidates, &context, &config, &counter).unwrap();
        assert_eq!(ranked[0].candidate.provider_id, "cloud");
        assert!(ranked[0].score >= 100.0);
    }

    #[test]
    fn scored_never_goes_negative() {
        let candidates = vec![RoutingCandidate::new("p1").with_health(HealthStatus::Unhealthy)];
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);
        let context = ctx().with_priority(-1000);

        let ranked = rank(RoutingStrategy::Scored, &candidates, &context, &config, &counter).unwrap();
        assert_eq!(ranked[0].score, 0.0);
    }

    #[test]
    fn user_selected_requires_a_preference() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        let result = rank(RoutingStrategy::UserSelected, &candidates, &ctx(), &config, &counter);
        assert!(result.is_err());
    }

    #[test]
    fn user_selected_matches_exact_provider() {
        let candidates = candidates();
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);
        let context = ctx().with_preferred_provider("cloud");

        let ranked =
            rank(RoutingStrategy::UserSelected, &candidates, &context, &config, &counter).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate.provider_id, "cloud");
    }

    #[test]
    fn weighted_random_never_picks_zero_weight_when_alternatives_exist() {
        let candidates = vec![
            RoutingCandidate::new("zero").with_weight(0.0),
            RoutingCandidate::new("nonzero").with_weight(1.0),
        ];
        let config = RoutingConfig::default();
        let counter = AtomicUsize::new(0);

        for _ in 0..20 {
            let ranked =
                rank(RoutingStrategy::WeightedRandom, &candidates, &ctx(), &config, &counter)
                    .unwrap();
            assert_eq!(ranked[0].candidate.provider_id, "nonzero");
        }
    }
}
