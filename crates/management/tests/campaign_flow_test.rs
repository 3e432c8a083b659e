//! Integration test for the full campaign flow: segment rules through
//! audience evaluation, campaign creation, and delivery logging.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use std::sync::Arc;

    use crm_audience::{matches, AudienceEvaluator, LocalEvaluator};
    use crm_management::models::{CampaignStatus, CreateCampaignRequest};
    use crm_management::{CrmStore, KeywordRuleGenerator, RuleGenerator};
    use crm_segmentation::{
        ConditionKind, ConditionNode, FieldName, GroupNode, GroupOperator, RuleNode, RuleValue,
    };

    /// Big spenders: totalSpend > 5000. Matches three of the six seeded
    /// demo customers (Acme Inc, Bolt Ltd, Eli Stone).
    fn big_spender_rules() -> RuleNode {
        RuleNode::Group(GroupNode {
            operator: GroupOperator::And,
            children: vec![RuleNode::Condition(ConditionNode {
                field: Some(FieldName::TotalSpend),
                condition: Some(ConditionKind::Gt),
                value: RuleValue::Number(5000.0),
            })],
        })
    }

    #[tokio::test]
    async fn test_preview_matches_seeded_customers() {
        let store = Arc::new(CrmStore::new());
        let evaluator = LocalEvaluator::new(store.clone(), 5);

        let preview = evaluator.preview(big_spender_rules()).await.unwrap();
        assert_eq!(preview.audience_size, 3);
        assert_eq!(preview.sample_customer_emails.len(), 3);
        assert!(preview
            .sample_customer_emails
            .contains(&"ops@acme.example".to_string()));
    }

    #[tokio::test]
    async fn test_campaign_delivery_reaches_matched_audience() {
        let store = CrmStore::new();
        let rules = big_spender_rules();

        let now = Utc::now();
        let audience: Vec<_> = store
            .list_customers()
            .into_iter()
            .filter(|c| matches(c, &rules, now).unwrap())
            .collect();
        assert_eq!(audience.len(), 3);

        let campaign = store.create_campaign(CreateCampaignRequest {
            name: "VIP offer".to_string(),
            message_template: "Hi {name}, enjoy early access!".to_string(),
            segment_rules: rules,
            audience_size: audience.len() as u64,
        });
        assert_eq!(campaign.status, CampaignStatus::Pending);

        let delivered = store.simulate_delivery(campaign.id, &audience);
        assert_eq!(delivered, 3);

        let sent = store.get_campaign(campaign.id).unwrap();
        assert_eq!(sent.status, CampaignStatus::Sent);
        assert!(sent.sent_at.is_some());

        let logs = store.logs_for_campaign(campaign.id);
        assert_eq!(logs.len(), 3);
        assert!(logs
            .iter()
            .all(|l| l.message_content.starts_with("Hi ") && !l.message_content.contains("{name}")));
    }

    #[tokio::test]
    async fn test_generated_rules_flow_into_preview() {
        let store = Arc::new(CrmStore::new());
        let rules = KeywordRuleGenerator
            .generate("customers who spent over 5000")
            .unwrap();

        let evaluator = LocalEvaluator::new(store, 5);
        let preview = evaluator.preview(rules).await.unwrap();
        assert_eq!(preview.audience_size, 3);
    }
}
