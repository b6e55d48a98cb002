//! Per-project grouping and balance totals.

use crate::{project::ProjectSet, query::QueryEntity};
use normalize::{FixedPoint, DEFAULT_DECIMALS};
use std::collections::HashSet;

/// Parts shown before the rest collapse into `+N`.
const MAX_PARTS: usize = 3;

/// Sum of one token's balances on one chain within a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTotal {
    pub chain_name: String,
    pub token_address: String,
    pub symbol: String,
    pub amount: FixedPoint,
}

impl TokenTotal {
    fn label(&self) -> String {
        if self.symbol.is_empty() {
            short_address(&self.token_address)
        } else {
            self.symbol.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub name: String,
    pub query_ids: Vec<String>,
    /// Non-zero totals, largest first
    pub totals: Vec<TokenTotal>,
    /// One-line rendering of `totals`
    pub total_text: String,
}

/// `0x1234...abcd`; short inputs are returned unchanged.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Group queries by project.
///
/// Projects follow catalog order, then names only found on queries in
/// first-seen order. Projects without queries are omitted.
pub fn summarize(projects: &ProjectSet, queries: &[QueryEntity]) -> Vec<ProjectSummary> {
    let mut groups: Vec<(String, Vec<&QueryEntity>)> = Vec::new();
    for query in queries {
        let name = query.project();
        match groups.iter_mut().find(|(n, _)| n == name) {
            Some((_, list)) => list.push(query),
            None => groups.push((name.to_string(), vec![query])),
        }
    }

    let mut ordered = Vec::with_capacity(groups.len());
    for name in projects.names() {
        if let Some(index) = groups.iter().position(|(n, _)| n == name) {
            ordered.push(groups.remove(index));
        }
    }
    ordered.append(&mut groups);

    ordered
        .into_iter()
        .map(|(name, list)| summarize_project(name, &list))
        .collect()
}

fn summarize_project(name: String, queries: &[&QueryEntity]) -> ProjectSummary {
    let chains: HashSet<&str> = queries
        .iter()
        .map(|q| q.chain_name.as_str())
        .filter(|c| !c.is_empty())
        .collect();

    let mut totals: Vec<TokenTotal> = Vec::new();
    for query in queries {
        let decimals = query.decimals.unwrap_or(DEFAULT_DECIMALS);
        let Ok(amount) = FixedPoint::parse(&query.balance, decimals) else {
            continue;
        };

        let existing = totals
            .iter_mut()
            .find(|t| t.chain_name == query.chain_name && t.token_address == query.token_address);
        match existing {
            Some(total) => {
                if let Some(sum) = total.amount.checked_add(amount) {
                    total.amount = sum;
                }
            }
            None => totals.push(TokenTotal {
                chain_name: query.chain_name.clone(),
                token_address: query.token_address.clone(),
                symbol: query.display_symbol().to_string(),
                amount,
            }),
        }
    }

    totals.retain(|t| !t.amount.is_zero());
    totals.sort_by(|a, b| b.amount.cmp_value(&a.amount));

    let parts: Vec<String> = totals
        .iter()
        .map(|t| {
            let part = if chains.len() > 1 {
                format!("{} {} {}", t.chain_name, t.amount, t.label())
            } else {
                format!("{} {}", t.amount, t.label())
            };
            part.trim().to_string()
        })
        .collect();

    let total_text = if parts.len() > MAX_PARTS {
        format!(
            "{} +{}",
            parts[..MAX_PARTS].join(" | "),
            parts.len() - MAX_PARTS
        )
    } else {
        parts.join(" | ")
    };

    ProjectSummary {
        name,
        query_ids: queries.iter().map(|q| q.id.clone()).collect(),
        totals,
        total_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(project: &str, chain: &str, token: &str, symbol: &str, balance: &str) -> QueryEntity {
        QueryEntity::from_value(&json!({
            "projectName": project,
            "chainKey": chain,
            "chainName": chain,
            "tokenAddress": token,
            "symbolResolved": symbol,
            "decimals": 6,
            "balance": balance,
        }))
        .unwrap()
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0xdAC17F958D2ee523a2206206994597C13D831ec7"),
            "0xdAC1...1ec7"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
    }

    #[test]
    fn test_totals_sum_in_fixed_point() {
        let queries = vec![
            query("ops", "ETH", "0xa", "USDT", "1.1"),
            query("ops", "ETH", "0xa", "USDT", "2.2"),
            query("ops", "ETH", "0xb", "USDC", "10"),
            query("ops", "ETH", "0xc", "DAI", "0"),
            query("ops", "ETH", "0xd", "BAD", ""),
        ];
        let summaries = summarize(&ProjectSet::new(), &queries);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].query_ids.len(), 5);
        assert_eq!(summaries[0].total_text, "10.0 USDC | 3.3 USDT");
    }

    #[test]
    fn test_totals_rescale_mixed_decimals() {
        let mut precise = query("ops", "ETH", "0xa", "USDT", "0.000000000001");
        precise.decimals = Some(18);
        let queries = vec![query("ops", "ETH", "0xa", "USDT", "1.5"), precise];
        let summaries = summarize(&ProjectSet::new(), &queries);

        let total = &summaries[0].totals[0];
        assert_eq!(total.amount.decimals, 18);
        assert_eq!(summaries[0].total_text, "1.500000000001 USDT");
    }

    #[test]
    fn test_multi_chain_prefix_and_collapse() {
        let queries = vec![
            query("ops", "ETH", "0xa", "USDT", "1"),
            query("ops", "BSC", "0xb", "USDT", "2"),
            query("ops", "ETH", "0xc", "USDC", "3"),
            query("ops", "BSC", "0xd", "", "4"),
        ];
        let summaries = summarize(&ProjectSet::new(), &queries);

        assert_eq!(
            summaries[0].total_text,
            "BSC 4.0 0xd | ETH 3.0 USDC | BSC 2.0 USDT +1"
        );
    }

    #[test]
    fn test_project_order_follows_catalog() {
        let queries = vec![
            query("zeta", "ETH", "0xa", "USDT", "1"),
            query("adhoc", "ETH", "0xa", "USDT", "1"),
            query("alpha", "ETH", "0xa", "USDT", "1"),
        ];
        let projects = ProjectSet::from_names(["alpha", "zeta", "empty"]);
        let names: Vec<_> = summarize(&projects, &queries)
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names, ["alpha", "zeta", "adhoc"]);
    }
}
