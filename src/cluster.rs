use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::fingerprint::hamming_distance;
use crate::host::Asset;

/// An asset paired with its fingerprint, if one could be computed.
#[derive(Debug, Clone)]
pub struct HashedAsset {
    pub asset: Asset,
    pub fingerprint: Option<String>,
}

/// Single-pass greedy clustering over `items` in input order.
///
/// Each unused item opens a new group and becomes its seed; every later
/// unused item within `threshold` bits *of the seed* joins the group and is
/// claimed for good. Membership is seed-relative, not transitive: two
/// duplicates that only resemble each other through a chain of neighbors
/// can land in different groups depending on which item got enumerated
/// first. That is an accepted approximation for near-identical duplicates,
/// where real distances are far below the threshold.
///
/// Items without a fingerprint are skipped entirely, and only groups with
/// at least two members are returned.
pub fn cluster_assets(items: &[HashedAsset], threshold: u32) -> Vec<Vec<Asset>> {
    let items: Vec<(&Asset, &str)> = items
        .iter()
        .filter_map(|h| h.fingerprint.as_deref().map(|fp| (&h.asset, fp)))
        .collect();

    let mut used = vec![false; items.len()];
    let mut groups = Vec::new();

    for i in 0..items.len() {
        if used[i] {
            continue;
        }
        let (seed, seed_fp) = items[i];
        used[i] = true;
        let mut group = vec![seed.clone()];

        for j in (i + 1)..items.len() {
            if used[j] {
                continue;
            }
            let (candidate, fp) = items[j];
            if hamming_distance(seed_fp, fp) <= threshold {
                used[j] = true;
                group.push(candidate.clone());
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
    }

    groups
}

/// Pick the asset to keep from a group of duplicates: the oldest upload
/// wins, everything else is returned as removal candidates.
///
/// The sort is stable, so assets with equal (or equally unparseable)
/// timestamps keep their group-assembly order and the earliest-enumerated
/// one survives. Expects a materialized group, i.e. at least one member.
pub fn select_survivor(mut group: Vec<Asset>) -> (Asset, Vec<Asset>) {
    group.sort_by_key(created_instant);
    let keep = group.remove(0);
    (keep, group)
}

/// Parse the host-native creation timestamp into a comparable instant.
///
/// The host emits fixed-format ISO-8601, so this normally succeeds; a
/// missing or unparseable timestamp sorts as the epoch, which makes such
/// assets win survivor selection over anything with a known upload time.
fn created_instant(asset: &Asset) -> DateTime<Utc> {
    let Some(raw) = asset.created_at.as_deref() else {
        return DateTime::UNIX_EPOCH;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    // Some host surfaces drop the time component.
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_time(NaiveTime::MIN).and_utc();
    }
    DateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(public_id: &str, created_at: Option<&str>) -> Asset {
        Asset {
            public_id: public_id.to_string(),
            secure_url: format!("https://res.example.com/image/upload/{public_id}.jpg"),
            created_at: created_at.map(str::to_string),
            folder: None,
        }
    }

    fn hashed(public_id: &str, fingerprint: Option<&str>) -> HashedAsset {
        HashedAsset {
            asset: asset(public_id, None),
            fingerprint: fingerprint.map(str::to_string),
        }
    }

    fn group_ids(groups: &[Vec<Asset>]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.iter().map(|a| a.public_id.as_str()).collect())
            .collect()
    }

    #[test]
    fn near_fingerprints_group_and_far_ones_stay_alone() {
        let items = vec![
            hashed("a", Some("00000000")),
            hashed("b", Some("00000003")), // 2 bits from a
            hashed("c", Some("ffffffff")),
            hashed("d", Some("0f0f0f0f")),
            hashed("e", Some("f0f0f0f0")),
        ];
        let groups = cluster_assets(&items, 12);
        assert_eq!(group_ids(&groups), vec![vec!["a", "b"]]);
    }

    #[test]
    fn clustering_is_deterministic() {
        let items = vec![
            hashed("a", Some("0000")),
            hashed("b", Some("0001")),
            hashed("c", Some("0003")),
            hashed("d", Some("ffff")),
            hashed("e", Some("fffe")),
        ];
        let first_groups = cluster_assets(&items, 2);
        let first = group_ids(&first_groups);
        let second_groups = cluster_assets(&items, 2);
        let second = group_ids(&second_groups);
        assert_eq!(first, second);
        assert_eq!(first, vec![vec!["a", "b", "c"], vec!["d", "e"]]);
    }

    #[test]
    fn no_asset_appears_in_two_groups() {
        // "c" is within threshold of both seeds; the earlier seed claims it.
        let items = vec![
            hashed("a", Some("00")),
            hashed("b", Some("0f")),
            hashed("c", Some("03")),
        ];
        let groups = cluster_assets(&items, 4);
        let mut seen = std::collections::HashSet::new();
        for group in &groups {
            for member in group {
                assert!(seen.insert(member.public_id.clone()), "{} grouped twice", member.public_id);
            }
        }
        assert_eq!(group_ids(&groups), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn grouping_is_seed_relative_not_transitive() {
        // b is within 2 bits of a, c is within 2 bits of b but 4 bits of a.
        // With threshold 2 the seed "a" claims only "b"; "c" is left alone
        // and a singleton group is never materialized.
        let items = vec![
            hashed("a", Some("00")),
            hashed("b", Some("03")),
            hashed("c", Some("0f")),
        ];
        let groups = cluster_assets(&items, 2);
        assert_eq!(group_ids(&groups), vec![vec!["a", "b"]]);
    }

    #[test]
    fn absent_fingerprints_never_cluster() {
        let items = vec![
            hashed("a", Some("00")),
            hashed("b", None),
            hashed("c", Some("00")),
            hashed("d", None),
        ];
        let groups = cluster_assets(&items, 0);
        assert_eq!(group_ids(&groups), vec![vec!["a", "c"]]);
    }

    #[test]
    fn mismatched_lengths_never_cluster() {
        let items = vec![hashed("a", Some("00")), hashed("b", Some("0000"))];
        assert!(cluster_assets(&items, 64).is_empty());
    }

    #[test]
    fn groups_of_one_are_not_materialized() {
        let items = vec![hashed("a", Some("00")), hashed("b", Some("ff"))];
        assert!(cluster_assets(&items, 2).is_empty());
    }

    #[test]
    fn oldest_asset_survives() {
        let group = vec![
            asset("mid", Some("2020-01-01")),
            asset("new", Some("2021-06-01")),
            asset("old", Some("2019-05-01")),
        ];
        let (keep, remove) = select_survivor(group);
        assert_eq!(keep.public_id, "old");
        let removed: Vec<&str> = remove.iter().map(|a| a.public_id.as_str()).collect();
        assert_eq!(removed, vec!["mid", "new"]);
    }

    #[test]
    fn full_timestamps_are_compared_as_instants() {
        let group = vec![
            asset("later", Some("2023-04-02T09:00:00Z")),
            asset("earlier", Some("2023-04-02T08:59:59Z")),
        ];
        let (keep, _) = select_survivor(group);
        assert_eq!(keep.public_id, "earlier");
    }

    #[test]
    fn timestamp_ties_keep_assembly_order() {
        let group = vec![
            asset("first", Some("2020-01-01")),
            asset("second", Some("2020-01-01")),
            asset("third", Some("2020-01-01")),
        ];
        let (keep, remove) = select_survivor(group);
        assert_eq!(keep.public_id, "first");
        assert_eq!(remove.len(), 2);
    }

    #[test]
    fn missing_timestamp_sorts_before_known_ones() {
        let group = vec![
            asset("dated", Some("2019-05-01")),
            asset("undated", None),
        ];
        let (keep, _) = select_survivor(group);
        assert_eq!(keep.public_id, "undated");
    }
}
