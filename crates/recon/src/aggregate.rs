use std::collections::{BTreeMap, BTreeSet};

use crate::key::dissolve_key;
use crate::model::{LocalityAggregate, OutageRecord, RegionAggregate};

/// Region name -> member locality names, as configured.
pub type RegionMap = BTreeMap<String, Vec<String>>;

/// Group records by locality (ignoring provider) and sum customers out.
///
/// One aggregate per distinct `dissolve_key`, sorted by key.
pub fn dissolve(records: &[OutageRecord]) -> Vec<LocalityAggregate> {
    let mut groups: BTreeMap<String, i64> = BTreeMap::new();

    for record in records {
        *groups.entry(dissolve_key(&record.locality)).or_insert(0) += record.customers_out as i64;
    }

    groups
        .into_iter()
        .map(|(key, total)| LocalityAggregate {
            key,
            total_customers_out: total,
        })
        .collect()
}

/// Roll locality totals up into configured regions.
///
/// Returns one aggregate per configured region (regions with no reporting
/// member still appear, with a zero total) and the locality keys that
/// belong to no region. A locality listed under several regions counts
/// toward each of them.
pub fn dissolve_regions(
    localities: &[LocalityAggregate],
    regions: &RegionMap,
) -> (Vec<RegionAggregate>, Vec<String>) {
    let mut membership: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (region, members) in regions {
        for member in members {
            membership.entry(dissolve_key(member)).or_default().push(region.as_str());
        }
    }

    let mut totals: BTreeMap<&str, (i64, BTreeSet<String>)> = regions
        .keys()
        .map(|name| (name.as_str(), (0, BTreeSet::new())))
        .collect();
    let mut unassigned = Vec::new();

    for agg in localities {
        match membership.get(&agg.key) {
            Some(owners) => {
                for owner in owners {
                    if let Some(entry) = totals.get_mut(owner) {
                        entry.0 += agg.total_customers_out;
                        entry.1.insert(agg.key.clone());
                    }
                }
            }
            None => unassigned.push(agg.key.clone()),
        }
    }

    let aggregates = totals
        .into_iter()
        .map(|(name, (total, members))| RegionAggregate {
            key: dissolve_key(name),
            name: name.to_string(),
            total_customers_out: total,
            localities: members.into_iter().collect(),
        })
        .collect();

    (aggregates, unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn rec(provider: &str, locality: &str, out: u64) -> OutageRecord {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        OutageRecord::new(provider, locality, 0, out, at)
    }

    #[test]
    fn sums_across_providers() {
        let records = vec![
            rec("Dominion Virginia Power", "Henrico", 250),
            rec("American Electric Power", "Henrico", 10),
            rec("Rappahannock Electric", "Caroline", 7),
        ];
        let aggs = dissolve(&records);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].key, "caroline");
        assert_eq!(aggs[0].total_customers_out, 7);
        assert_eq!(aggs[1].key, "henrico");
        assert_eq!(aggs[1].total_customers_out, 260);
    }

    #[test]
    fn spelling_variants_share_a_key() {
        let records = vec![
            rec("Dominion Virginia Power", "Prince George's", 3),
            rec("Prince George Electric", "prince georges", 4),
        ];
        let aggs = dissolve(&records);
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].key, "prince georges");
        assert_eq!(aggs[0].total_customers_out, 7);
    }

    #[test]
    fn zero_outages_still_produce_an_aggregate() {
        let aggs = dissolve(&[rec("Dominion Virginia Power", "Surry", 0)]);
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].total_customers_out, 0);
    }

    #[test]
    fn regions_sum_member_localities() {
        let localities = dissolve(&[
            rec("Dominion Virginia Power", "Henrico", 250),
            rec("Dominion Virginia Power", "Chesterfield", 50),
            rec("American Electric Power", "Roanoke", 40),
            rec("American Electric Power", "Bland", 1),
        ]);
        let mut regions = RegionMap::new();
        regions.insert("Region 1".into(), vec!["Henrico".into(), "Chesterfield".into()]);
        regions.insert("Region 6".into(), vec!["Roanoke".into()]);
        regions.insert("Region 7".into(), vec!["Wise".into()]);

        let (aggs, unassigned) = dissolve_regions(&localities, &regions);
        assert_eq!(aggs.len(), 3);
        assert_eq!(aggs[0].key, "region 1");
        assert_eq!(aggs[0].total_customers_out, 300);
        assert_eq!(aggs[0].localities, vec!["chesterfield", "henrico"]);
        assert_eq!(aggs[1].total_customers_out, 40);
        assert_eq!(aggs[2].name, "Region 7");
        assert_eq!(aggs[2].total_customers_out, 0);
        assert!(aggs[2].localities.is_empty());
        assert_eq!(unassigned, vec!["bland"]);
    }

    proptest! {
        #[test]
        fn dissolve_preserves_totals(
            rows in proptest::collection::vec(
                (prop::sample::select(vec!["Henrico", "henrico", "Surry", "King George", "Prince George's"]),
                 0u64..10_000),
                0..40,
            )
        ) {
            let records: Vec<_> = rows
                .iter()
                .map(|(loc, out)| rec("Provider", loc, *out))
                .collect();
            let aggs = dissolve(&records);

            let keys: BTreeSet<_> = records.iter().map(|r| dissolve_key(&r.locality)).collect();
            prop_assert_eq!(aggs.len(), keys.len());

            for agg in &aggs {
                let expected: i64 = records
                    .iter()
                    .filter(|r| dissolve_key(&r.locality) == agg.key)
                    .map(|r| r.customers_out as i64)
                    .sum();
                prop_assert_eq!(agg.total_customers_out, expected);
            }

            let grand: i64 = aggs.iter().map(|a| a.total_customers_out).sum();
            let expected: i64 = records.iter().map(|r| r.customers_out as i64).sum();
            prop_assert_eq!(grand, expected);
        }
    }
}
