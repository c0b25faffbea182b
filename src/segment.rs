//! Segment vocabulary and the priority-ordered classification rules

use std::fmt;

use serde::Serialize;

use crate::scoring::ScoreCard;

/// Closed set of customer segments, declared in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "VIP Customers")]
    VipCustomers,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Growth Potential")]
    GrowthPotential,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Hibernating")]
    Hibernating,
    #[serde(rename = "New Customer")]
    NewCustomer,
    #[serde(rename = "One-Time Buyer")]
    OneTimeBuyer,
    #[serde(rename = "Starter Customer")]
    StarterCustomer,
    #[serde(rename = "Regular Customer")]
    RegularCustomer,
}

impl Segment {
    /// Every segment, in classification priority order
    pub const ALL: [Segment; 10] = [
        Segment::Champions,
        Segment::VipCustomers,
        Segment::LoyalCustomers,
        Segment::GrowthPotential,
        Segment::AtRisk,
        Segment::Hibernating,
        Segment::NewCustomer,
        Segment::OneTimeBuyer,
        Segment::StarterCustomer,
        Segment::RegularCustomer,
    ];

    /// Human-readable tag
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::VipCustomers => "VIP Customers",
            Segment::LoyalCustomers => "Loyal Customers",
            Segment::GrowthPotential => "Growth Potential",
            Segment::AtRisk => "At Risk",
            Segment::Hibernating => "Hibernating",
            Segment::NewCustomer => "New Customer",
            Segment::OneTimeBuyer => "One-Time Buyer",
            Segment::StarterCustomer => "Starter Customer",
            Segment::RegularCustomer => "Regular Customer",
        }
    }

    /// Stable kebab-case identifier, accepted on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Segment::Champions => "champions",
            Segment::VipCustomers => "vip-customers",
            Segment::LoyalCustomers => "loyal-customers",
            Segment::GrowthPotential => "growth-potential",
            Segment::AtRisk => "at-risk",
            Segment::Hibernating => "hibernating",
            Segment::NewCustomer => "new-customer",
            Segment::OneTimeBuyer => "one-time-buyer",
            Segment::StarterCustomer => "starter-customer",
            Segment::RegularCustomer => "regular-customer",
        }
    }

    /// Marketing action recommended for customers in this segment
    pub fn recommended_action(&self) -> &'static str {
        match self {
            Segment::Champions => "VIP loyalty program, early access to launches",
            Segment::VipCustomers => "Exclusive offers, referral program",
            Segment::LoyalCustomers => "Cross-sell and upsell, personalized newsletter",
            Segment::GrowthPotential => "Re-engagement campaigns, discount coupons",
            Segment::AtRisk => "Urgent win-back, special offers",
            Segment::Hibernating => "Email marketing, satisfaction survey",
            Segment::NewCustomer => "Onboarding, first-purchase discount",
            Segment::OneTimeBuyer => "Second-purchase coupon, follow-up",
            Segment::StarterCustomer => "Nurture with relevant content",
            Segment::RegularCustomer => "Maintain regular engagement",
        }
    }

    /// Chart color as RGB
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Segment::Champions => (0x71, 0x5c, 0xba),
            Segment::VipCustomers => (0x85, 0x72, 0xc6),
            Segment::LoyalCustomers => (0x99, 0x88, 0xd2),
            Segment::GrowthPotential => (0xad, 0x9e, 0xde),
            Segment::AtRisk => (0xc1, 0xb4, 0xea),
            Segment::Hibernating => (0x7b, 0x66, 0xbf),
            Segment::NewCustomer => (0x6c, 0x57, 0xb5),
            Segment::OneTimeBuyer => (0x5d, 0x48, 0xa6),
            Segment::StarterCustomer => (0x49, 0x34, 0x92),
            Segment::RegularCustomer => (0x35, 0x20, 0x7e),
        }
    }

    /// Position in the priority order, 0 for Champions
    pub fn rank(&self) -> usize {
        Segment::ALL
            .iter()
            .position(|segment| segment == self)
            .unwrap_or(Segment::ALL.len())
    }

    /// Look a segment up by label or slug, ignoring case
    pub fn from_name(name: &str) -> Option<Segment> {
        let name = name.trim();
        Segment::ALL.into_iter().find(|segment| {
            segment.label().eq_ignore_ascii_case(name) || segment.slug().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Facts a classification rule may look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentInput {
    pub scores: ScoreCard,
    pub order_count: u32,
    pub total_spent: f64,
}

/// One entry of the ordered rule list
pub struct SegmentRule {
    pub segment: Segment,
    /// Condition as written in the rule table
    pub condition: &'static str,
    predicate: fn(&SegmentInput) -> bool,
}

impl SegmentRule {
    pub fn applies(&self, input: &SegmentInput) -> bool {
        (self.predicate)(input)
    }
}

impl fmt::Debug for SegmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentRule")
            .field("segment", &self.segment)
            .field("condition", &self.condition)
            .finish()
    }
}

/// Classification rules, first match wins. Rules overlap, so the order is part
/// of the contract. Anything unmatched is a [`Segment::RegularCustomer`].
pub static SEGMENT_RULES: [SegmentRule; 9] = [
    SegmentRule {
        segment: Segment::Champions,
        condition: "recency = 5 and frequency >= 4 and value >= 4",
        predicate: |input: &SegmentInput| {
            input.scores.recency == 5 && input.scores.frequency >= 4 && input.scores.value >= 4
        },
    },
    SegmentRule {
        segment: Segment::VipCustomers,
        condition: "recency >= 4 and frequency >= 4 and value >= 4",
        predicate: |input: &SegmentInput| {
            input.scores.recency >= 4 && input.scores.frequency >= 4 && input.scores.value >= 4
        },
    },
    SegmentRule {
        segment: Segment::LoyalCustomers,
        condition: "recency >= 4 and frequency >= 3 and value >= 3",
        predicate: |input: &SegmentInput| {
            input.scores.recency >= 4 && input.scores.frequency >= 3 && input.scores.value >= 3
        },
    },
    SegmentRule {
        segment: Segment::GrowthPotential,
        condition: "recency >= 3 and frequency >= 2 and value >= 2",
        predicate: |input: &SegmentInput| {
            input.scores.recency >= 3 && input.scores.frequency >= 2 && input.scores.value >= 2
        },
    },
    SegmentRule {
        segment: Segment::AtRisk,
        condition: "recency <= 2 and frequency >= 3 and value >= 3",
        predicate: |input: &SegmentInput| {
            input.scores.recency <= 2 && input.scores.frequency >= 3 && input.scores.value >= 3
        },
    },
    SegmentRule {
        segment: Segment::Hibernating,
        condition: "recency <= 2 and frequency >= 2 and value >= 2",
        predicate: |input: &SegmentInput| {
            input.scores.recency <= 2 && input.scores.frequency >= 2 && input.scores.value >= 2
        },
    },
    SegmentRule {
        segment: Segment::NewCustomer,
        condition: "recency <= 1 and order_count = 0",
        predicate: |input: &SegmentInput| input.scores.recency <= 1 && input.order_count == 0,
    },
    SegmentRule {
        segment: Segment::OneTimeBuyer,
        condition: "recency <= 1 and order_count = 1",
        predicate: |input: &SegmentInput| input.scores.recency <= 1 && input.order_count == 1,
    },
    SegmentRule {
        segment: Segment::StarterCustomer,
        condition: "recency >= 3 and order_count <= 1 and total_spent <= 500",
        predicate: |input: &SegmentInput| {
            input.scores.recency >= 3 && input.order_count <= 1 && input.total_spent <= 500.0
        },
    },
];

/// Assign a segment by walking [`SEGMENT_RULES`] in order
pub fn classify(input: &SegmentInput) -> Segment {
    SEGMENT_RULES
        .iter()
        .find(|rule| rule.applies(input))
        .map(|rule| rule.segment)
        .unwrap_or(Segment::RegularCustomer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(r: u8, f: u8, v: u8, order_count: u32, total_spent: f64) -> SegmentInput {
        SegmentInput {
            scores: ScoreCard::new(r, f, v),
            order_count,
            total_spent,
        }
    }

    #[test]
    fn test_rules_follow_segment_priority_order() {
        let ruled: Vec<Segment> = SEGMENT_RULES.iter().map(|rule| rule.segment).collect();
        assert_eq!(ruled, Segment::ALL[..9].to_vec());
    }

    #[test]
    fn test_each_rule_reachable() {
        assert_eq!(classify(&input(5, 5, 5, 12, 6200.0)), Segment::Champions);
        assert_eq!(classify(&input(4, 4, 4, 6, 2500.0)), Segment::VipCustomers);
        assert_eq!(classify(&input(4, 3, 3, 3, 1200.0)), Segment::LoyalCustomers);
        assert_eq!(classify(&input(3, 2, 2, 2, 600.0)), Segment::GrowthPotential);
        assert_eq!(classify(&input(2, 3, 3, 4, 1500.0)), Segment::AtRisk);
        assert_eq!(classify(&input(2, 2, 2, 2, 700.0)), Segment::Hibernating);
        assert_eq!(classify(&input(1, 1, 1, 0, 0.0)), Segment::NewCustomer);
        assert_eq!(classify(&input(1, 2, 1, 1, 120.0)), Segment::OneTimeBuyer);
        assert_eq!(classify(&input(5, 2, 1, 1, 300.0)), Segment::StarterCustomer);
        assert_eq!(classify(&input(5, 2, 1, 2, 300.0)), Segment::RegularCustomer);
    }

    #[test]
    fn test_champions_precede_vip_when_both_match() {
        let both = input(5, 4, 4, 5, 2000.0);
        assert!(SEGMENT_RULES[0].applies(&both));
        assert!(SEGMENT_RULES[1].applies(&both));
        assert_eq!(classify(&both), Segment::Champions);
    }

    #[test]
    fn test_at_risk_precedes_hibernating_when_both_match() {
        let both = input(1, 3, 3, 4, 1500.0);
        assert!(SEGMENT_RULES[4].applies(&both));
        assert!(SEGMENT_RULES[5].applies(&both));
        assert_eq!(classify(&both), Segment::AtRisk);
    }

    #[test]
    fn test_growth_potential_precedes_starter_when_both_match() {
        // recency 3, one order of exactly 500 satisfies rules 4 and 9
        let both = input(3, 2, 2, 1, 500.0);
        assert!(SEGMENT_RULES[3].applies(&both));
        assert!(SEGMENT_RULES[8].applies(&both));
        assert_eq!(classify(&both), Segment::GrowthPotential);
    }

    #[test]
    fn test_actions_are_distinct() {
        let mut actions: Vec<&str> = Segment::ALL.iter().map(|s| s.recommended_action()).collect();
        actions.sort();
        actions.dedup();
        assert_eq!(actions.len(), Segment::ALL.len());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Segment::from_name("Champions"), Some(Segment::Champions));
        assert_eq!(Segment::from_name("vip customers"), Some(Segment::VipCustomers));
        assert_eq!(Segment::from_name("one-time-buyer"), Some(Segment::OneTimeBuyer));
        assert_eq!(Segment::from_name("  At Risk "), Some(Segment::AtRisk));
        assert_eq!(Segment::from_name("Platinum"), None);
    }

    #[test]
    fn test_rank_matches_all_order() {
        for (idx, segment) in Segment::ALL.iter().enumerate() {
            assert_eq!(segment.rank(), idx);
        }
    }

    #[test]
    fn test_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Segment::OneTimeBuyer).unwrap(),
            "\"One-Time Buyer\""
        );
    }
}
