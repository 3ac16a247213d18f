use paperlink_core::{IdentifierMapping, KgMatch, LinkCandidate};
use tracing::Span;

/// Inner join of matches with the mapping on the record ID. Unmapped matches are dropped.
pub fn join_with_mapping(
    matches: Vec<KgMatch>,
    mapping: &IdentifierMapping,
    span: &Span,
) -> Vec<LinkCandidate> {
    matches
        .into_iter()
        .filter_map(|matched| match mapping.get(&matched.record_id) {
            Some(dataset_item_id) => Some(LinkCandidate {
                dataset_item_id: dataset_item_id.clone(),
                matched,
            }),
            None => {
                tracing::warn!(
                    parent: span,
                    record_id = matched.record_id,
                    "no knowledge-base item for dataset, skipped"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kg_match(record_id: u32) -> KgMatch {
        KgMatch {
            record_id,
            record_name: Some(format!("Dataset {record_id}")),
            record_url: Some(format!("https://archive.ics.uci.edu/dataset/{record_id}")),
            external_id: format!("2101.0000{record_id}"),
            external_title: None,
            kb_item_id: format!("Q{}", 100 + record_id),
        }
    }

    #[test]
    fn keeps_only_mapped_records() {
        let matches = (1..=5).map(kg_match).collect();
        let mapping: IdentifierMapping = [(1, "Q501"), (3, "Q503"), (5, "Q505"), (8, "Q508")]
            .into_iter()
            .map(|(id, q)| (id, q.to_string()))
            .collect();

        let joined = join_with_mapping(matches, &mapping, &Span::none());

        assert_eq!(joined.len(), 3);
        assert_eq!(
            joined
                .iter()
                .map(|c| (c.matched.record_id, c.dataset_item_id.as_str()))
                .collect::<Vec<_>>(),
            vec![(1, "Q501"), (3, "Q503"), (5, "Q505")]
        );
        let pair = joined[1].to_claim_pair();
        assert_eq!(pair.publication_item_id.as_deref(), Some("Q103"));
        assert_eq!(
            pair.provenance_url.as_deref(),
            Some("https://archive.ics.uci.edu/dataset/3")
        );
    }
}
