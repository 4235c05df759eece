use crate::analytics::AnalyticsRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How often a normalized search term was used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

/// Aggregated search metrics over a set of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_searches: u64,
    pub average_results: f64,
    /// Fraction of searches (0.0 to 1.0) that returned nothing
    pub zero_result_rate: f64,
    pub top_terms: Vec<TermCount>,
}

impl AnalyticsSummary {
    /// Aggregate records, keeping the `top_n` most frequent terms
    pub fn from_records(records: &[AnalyticsRecord], top_n: usize) -> Self {
        let total_searches = records.len() as u64;
        if total_searches == 0 {
            return Self {
                total_searches: 0,
                average_results: 0.0,
                zero_result_rate: 0.0,
                top_terms: Vec::new(),
            };
        }

        let total_results: u64 = records.iter().map(|r| r.result_count).sum();
        let zero_results = records.iter().filter(|r| r.result_count == 0).count() as u64;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in records {
            let term = normalize_term(&record.query);
            if !term.is_empty() {
                *counts.entry(term).or_insert(0) += 1;
            }
        }

        let mut top_terms: Vec<TermCount> = counts
            .into_iter()
            .map(|(term, count)| TermCount { term, count })
            .collect();
        top_terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
        top_terms.truncate(top_n);

        Self {
            total_searches,
            average_results: total_results as f64 / total_searches as f64,
            zero_result_rate: zero_results as f64 / total_searches as f64,
            top_terms,
        }
    }
}

/// Lowercase and collapse whitespace so "Red  Shirt" and "red shirt" count together
pub fn normalize_term(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
