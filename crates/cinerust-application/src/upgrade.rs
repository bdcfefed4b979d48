// SPDX-License-Identifier: GPL-3.0-or-later
use cinerust_domain::{Quality, QualityProfile};

/// Whether the candidate quality is a genuine upgrade over the current
/// one under the profile: strictly higher by (tier, revision) ordering,
/// listed in the profile, and the profile permits upgrades at all.
/// Equal quality is never an upgrade.
pub fn is_upgradable(profile: &QualityProfile, current: Quality, candidate: Quality) -> bool {
    if !profile.upgrade_allowed {
        return false;
    }

    if !profile.allows(candidate.source) {
        return false;
    }

    candidate > current
}

/// Whether the current quality still sits below the profile cutoff, i.e.
/// further searching/grabbing is still worthwhile regardless of any
/// particular candidate.
pub fn cutoff_not_met(profile: &QualityProfile, current: Quality) -> bool {
    current.source.rank() < profile.cutoff.rank()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinerust_domain::{QualitySource, Revision};

    fn hd_profile() -> QualityProfile {
        QualityProfile::new(
            "HD",
            vec![
                QualitySource::Hdtv720p,
                QualitySource::Webdl720p,
                QualitySource::Webdl1080p,
                QualitySource::Bluray1080p,
            ],
            QualitySource::Webdl1080p,
        )
    }

    fn q(source: QualitySource) -> Quality {
        Quality::new(source)
    }

    #[test]
    fn higher_listed_quality_is_upgradable() {
        let profile = hd_profile();
        assert!(is_upgradable(
            &profile,
            q(QualitySource::Webdl720p),
            q(QualitySource::Webdl1080p)
        ));
    }

    #[test]
    fn equal_quality_is_never_upgradable() {
        let profile = hd_profile();
        assert!(!is_upgradable(
            &profile,
            q(QualitySource::Webdl1080p),
            q(QualitySource::Webdl1080p)
        ));
    }

    #[test]
    fn lower_quality_is_not_upgradable() {
        let profile = hd_profile();
        assert!(!is_upgradable(
            &profile,
            q(QualitySource::Bluray1080p),
            q(QualitySource::Webdl720p)
        ));
    }

    #[test]
    fn unlisted_candidate_is_not_upgradable() {
        let profile = hd_profile();
        // Ranks above everything listed, but the profile does not want it.
        assert!(!is_upgradable(
            &profile,
            q(QualitySource::Webdl720p),
            q(QualitySource::Bluray2160p)
        ));
    }

    #[test]
    fn revision_bump_within_same_tier_is_upgradable() {
        let profile = hd_profile();
        let proper = Quality::with_revision(QualitySource::Webdl1080p, Revision::new(2, 0));
        assert!(is_upgradable(&profile, q(QualitySource::Webdl1080p), proper));
        assert!(!is_upgradable(&profile, proper, q(QualitySource::Webdl1080p)));
    }

    #[test]
    fn upgrades_disallowed_by_profile() {
        let mut profile = hd_profile();
        profile.upgrade_allowed = false;
        assert!(!is_upgradable(
            &profile,
            q(QualitySource::Webdl720p),
            q(QualitySource::Webdl1080p)
        ));
    }

    #[test]
    fn cutoff_not_met_below_cutoff() {
        let profile = hd_profile();
        assert!(cutoff_not_met(&profile, q(QualitySource::Webdl720p)));
    }

    #[test]
    fn cutoff_met_at_and_above_cutoff() {
        let profile = hd_profile();
        assert!(!cutoff_not_met(&profile, q(QualitySource::Webdl1080p)));
        assert!(!cutoff_not_met(&profile, q(QualitySource::Bluray1080p)));
    }

    #[test]
    fn unknown_quality_ranks_below_every_listed_quality() {
        let profile = hd_profile();
        assert!(cutoff_not_met(&profile, q(QualitySource::Unknown)));
        assert!(is_upgradable(
            &profile,
            q(QualitySource::Unknown),
            q(QualitySource::Hdtv720p)
        ));
    }
}
