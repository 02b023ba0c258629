//! 规则合并器
//! 将多个规则源解码得到的记录集合并为一条去重、有序的记录
//! 基于集合累加：结果与源顺序无关，重复源不影响结果

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::model::{MergedRecord, RuleRecord, RuleRecordSet, RuleScalar};

/// 合并累加器：字段名 -> 标量集合
/// 可拆分后两两归并（combine），用于并行归约
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeAccumulator {
    fields: BTreeMap<String, BTreeSet<RuleScalar>>,
}

impl MergeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加单条记录
    pub fn absorb_record(&mut self, record: &RuleRecord) {
        for (field, value) in record.iter() {
            if value.is_empty() {
                continue;
            }
            self.fields
                .entry(field.clone())
                .or_default()
                .extend(value.scalars().cloned());
        }
    }

    /// 累加一个记录集
    pub fn absorb(&mut self, record_set: &RuleRecordSet) {
        for record in record_set.iter() {
            self.absorb_record(record);
        }
    }

    /// 与另一个累加器做集合并
    pub fn combine(mut self, other: MergeAccumulator) -> Self {
        for (field, values) in other.fields {
            self.fields.entry(field).or_default().extend(values);
        }
        self
    }

    /// 输出合并结果（BTreeSet 迭代即升序）
    pub fn finish(self) -> MergedRecord {
        let fields = self
            .fields
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, values)| (field, values.into_iter().collect()))
            .collect();
        MergedRecord::from_sorted(fields)
    }
}

/// 规则合并器（无状态纯函数）
pub struct RuleMerger;

impl RuleMerger {
    /// 合并多个记录集
    pub fn merge<'a, I>(record_sets: I) -> MergedRecord
    where
        I: IntoIterator<Item = &'a RuleRecordSet>,
    {
        let mut acc = MergeAccumulator::new();
        let mut set_count = 0usize;
        for record_set in record_sets {
            acc.absorb(record_set);
            set_count += 1;
        }
        let merged = acc.finish();
        debug!(
            "合并完成：记录集 {} 个，字段 {} 个，取值 {} 个",
            set_count,
            merged.len(),
            merged.value_count()
        );
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::model::RuleValue;

    fn record_set(fields: Vec<(&str, RuleValue)>) -> RuleRecordSet {
        RuleRecordSet::new(vec![fields.into_iter().collect()])
    }

    #[test]
    fn test_merge_two_sources_dedup_and_sort() {
        // 测试场景：两个源各一条记录，重复值只保留一次并升序
        let a = record_set(vec![("domain_suffix", RuleValue::list(["a.com"]))]);
        let b = record_set(vec![("domain_suffix", RuleValue::list(["b.com", "a.com"]))]);

        let merged = RuleMerger::merge([&a, &b]);
        assert_eq!(
            merged.get("domain_suffix").unwrap(),
            &[RuleScalar::from("a.com"), RuleScalar::from("b.com")]
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = record_set(vec![
            ("domain", RuleValue::list(["z.org", "m.org"])),
            ("domain_keyword", RuleValue::scalar("google")),
        ]);
        let b = record_set(vec![
            ("domain", RuleValue::scalar("a.org")),
            ("process_name", RuleValue::list(["curl"])),
        ]);
        assert_eq!(RuleMerger::merge([&a, &b]), RuleMerger::merge([&b, &a]));
    }

    #[test]
    fn test_merge_is_idempotent_under_duplication() {
        let a = record_set(vec![("domain_suffix", RuleValue::list(["x.com", "y.com"]))]);
        assert_eq!(RuleMerger::merge([&a, &a]), RuleMerger::merge([&a]));
    }

    #[test]
    fn test_merge_mixed_scalar_and_list_shapes() {
        // 测试场景：同一字段在不同源中分别为标量和序列
        let a = record_set(vec![("domain", RuleValue::scalar("b.com"))]);
        let b = record_set(vec![("domain", RuleValue::list(["a.com", "b.com"]))]);
        let merged = RuleMerger::merge([&a, &b]);
        assert_eq!(
            merged.get("domain").unwrap(),
            &[RuleScalar::from("a.com"), RuleScalar::from("b.com")]
        );
    }

    #[test]
    fn test_empty_field_is_absent() {
        // 测试场景：空序列字段不出现在结果中
        let mut record = RuleRecord::new();
        record.insert("domain_keyword", RuleValue::List(vec![]));
        record.insert("domain", RuleValue::list(["a.com"]));
        let merged = RuleMerger::merge([&RuleRecordSet::new(vec![record])]);
        assert!(merged.get("domain_keyword").is_none());
        assert!(merged.get("domain").is_some());
    }

    #[test]
    fn test_merge_multiple_records_in_one_set() {
        let set = RuleRecordSet::new(vec![
            [("domain", RuleValue::list(["a.com"]))].into_iter().collect(),
            [("ip_cidr", RuleValue::list(["10.0.0.0/8"]))].into_iter().collect(),
        ]);
        let merged = RuleMerger::merge([&set]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = RuleMerger::merge(std::iter::empty::<&RuleRecordSet>());
        assert!(merged.is_empty());
        let merged = RuleMerger::merge([&RuleRecordSet::default()]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_pairwise_combine_matches_sequential_merge() {
        // 测试场景：拆分累加后两两归并，结果与顺序合并一致
        let sets = [
            record_set(vec![("domain", RuleValue::list(["c.com", "a.com"]))]),
            record_set(vec![("domain", RuleValue::list(["b.com"]))]),
            record_set(vec![("port", RuleValue::list([443i64, 80]))]),
        ];

        let mut left = MergeAccumulator::new();
        left.absorb(&sets[2]);
        let mut right = MergeAccumulator::new();
        right.absorb(&sets[0]);
        right.absorb(&sets[1]);

        assert_eq!(right.combine(left).finish(), RuleMerger::merge(sets.iter()));
    }

    #[test]
    fn test_output_sorted_without_duplicates() {
        let set = record_set(vec![(
            "domain_suffix",
            RuleValue::list(["d.com", "b.com", "d.com", "a.com", "b.com"]),
        )]);
        let merged = RuleMerger::merge([&set]);
        let values = merged.get("domain_suffix").unwrap();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(values.len(), 3);
    }
}
