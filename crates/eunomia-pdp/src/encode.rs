//! Encoder: pure serialization of the authored tree.
//!
//! Encoding is a data-shape transformation, not a decision evaluator: it
//! flattens a Rule/Policy/PolicySet tree into one shared block array plus
//! grouping indexes that downstream consumers read back verbatim. Closures
//! (conditions, effects, handlers) are not serializable; the encoded form
//! records their declarative envelope instead: the target, the statically
//! known effect polarity, and the fulfill-on tags of obligations and
//! advice.
//!
//! Rules carrying a [`RuleGroup`] are indexed into the id / type /
//! attribute / to-one / to-many groupings; the paired `*_index` readers
//! recover exactly the groupings that were encoded.

use serde::{Deserialize, Serialize};

use crate::combining::{PolicyCombiningAlgorithm, RuleCombiningAlgorithm};
use crate::decision::Decision;
use crate::policy::{Policy, PolicyChild, PolicySet};
use crate::rule::{Rule, RuleGroup};
use crate::target::Target;

/// What kind of entity an encoded block describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A rule block.
    Rule,
    /// A policy block.
    Policy,
    /// A policy-set block.
    PolicySet,
}

/// One entity in the shared block array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedBlock {
    /// The entity's identifier, if one was authored.
    pub id: Option<String>,
    /// The entity kind.
    pub kind: BlockKind,
    /// The applicability target (wildcard when none was authored).
    pub target: Target,
    /// Statically known effect polarity for rule blocks with a constant
    /// effect; `None` for opaque effects and non-rule blocks.
    pub effect: Option<bool>,
    /// Fulfill-on tags of attached obligations, in order.
    pub obligations: Vec<Decision>,
    /// Fulfill-on tags of attached advice, in order.
    pub advice: Vec<Decision>,
    /// Rule combining algorithm, for policy blocks.
    pub rule_algorithm: Option<RuleCombiningAlgorithm>,
    /// Policy combining algorithm, for policy-set blocks.
    pub policy_algorithm: Option<PolicyCombiningAlgorithm>,
    /// Indexes of child blocks in the shared array.
    pub children: Vec<usize>,
}

/// The encoded form of a rule, policy, or policy set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encoded {
    blocks: Vec<EncodedBlock>,
    root: usize,
    id_rule: Option<usize>,
    type_rule: Option<usize>,
    attribute_rules: Vec<(String, usize)>,
    to_one_rules: Vec<(String, usize)>,
    to_many_rules: Vec<(String, usize)>,
}

impl Encoded {
    /// The shared block array.
    pub fn blocks(&self) -> &[EncodedBlock] {
        &self.blocks
    }

    /// The root block of the encoded tree.
    pub fn root(&self) -> &EncodedBlock {
        &self.blocks[self.root]
    }

    /// The index of the root block.
    pub fn root_index(&self) -> usize {
        self.root
    }

    /// The target of a rule block, if `index` is one.
    pub fn rule_target(&self, index: usize) -> Option<&Target> {
        self.blocks
            .get(index)
            .filter(|block| block.kind == BlockKind::Rule)
            .map(|block| &block.target)
    }

    /// The target of a policy or policy-set block, if `index` is one.
    pub fn policy_target(&self, index: usize) -> Option<&Target> {
        self.blocks
            .get(index)
            .filter(|block| block.kind != BlockKind::Rule)
            .map(|block| &block.target)
    }

    /// The index of the id-guarding rule, if one was encoded.
    pub fn id_rule_index(&self) -> Option<usize> {
        self.id_rule
    }

    /// The index of the type-guarding rule, if one was encoded.
    pub fn type_rule_index(&self) -> Option<usize> {
        self.type_rule
    }

    /// (attribute name, block index) tuples of attribute-guarding rules.
    pub fn attribute_rules_indexes(&self) -> &[(String, usize)] {
        &self.attribute_rules
    }

    /// (relationship name, block index) tuples of to-one-guarding rules.
    pub fn to_one_rules_indexes(&self) -> &[(String, usize)] {
        &self.to_one_rules
    }

    /// (relationship name, block index) tuples of to-many-guarding rules.
    pub fn to_many_rules_indexes(&self) -> &[(String, usize)] {
        &self.to_many_rules
    }
}

/// Encode a single rule.
pub fn encode_rule(rule: &Rule) -> Encoded {
    let mut encoded = Encoded::default();
    encoded.root = push_rule(rule, &mut encoded);
    encoded
}

/// Encode a policy and its rules into one shared block array.
pub fn encode_policy(policy: &Policy) -> Encoded {
    let mut encoded = Encoded::default();
    encoded.root = push_policy(policy, &mut encoded);
    encoded
}

/// Encode a policy set recursively into one shared block array.
pub fn encode_policy_set(set: &PolicySet) -> Encoded {
    let mut encoded = Encoded::default();
    encoded.root = push_set(set, &mut encoded);
    encoded
}

fn push_rule(rule: &Rule, encoded: &mut Encoded) -> usize {
    let index = encoded.blocks.len();
    encoded.blocks.push(EncodedBlock {
        id: rule.id().map(str::to_string),
        kind: BlockKind::Rule,
        target: rule.target().cloned().unwrap_or_default(),
        effect: rule.effect().known_value(),
        obligations: rule.obligations().iter().map(|o| o.fulfill_on()).collect(),
        advice: rule.advice().iter().map(|a| a.fulfill_on()).collect(),
        rule_algorithm: None,
        policy_algorithm: None,
        children: Vec::new(),
    });
    match rule.group() {
        Some(RuleGroup::Id) => encoded.id_rule = Some(index),
        Some(RuleGroup::Type) => encoded.type_rule = Some(index),
        Some(RuleGroup::Attribute(name)) => {
            encoded.attribute_rules.push((name.clone(), index));
        }
        Some(RuleGroup::ToOne(name)) => encoded.to_one_rules.push((name.clone(), index)),
        Some(RuleGroup::ToMany(name)) => encoded.to_many_rules.push((name.clone(), index)),
        None => {}
    }
    index
}

fn push_policy(policy: &Policy, encoded: &mut Encoded) -> usize {
    let children: Vec<usize> = policy
        .rules()
        .iter()
        .map(|rule| push_rule(rule, encoded))
        .collect();
    let index = encoded.blocks.len();
    encoded.blocks.push(EncodedBlock {
        id: policy.id().map(str::to_string),
        kind: BlockKind::Policy,
        target: policy.target().cloned().unwrap_or_default(),
        effect: None,
        obligations: policy.obligations().iter().map(|o| o.fulfill_on()).collect(),
        advice: policy.advice().iter().map(|a| a.fulfill_on()).collect(),
        rule_algorithm: Some(policy.algorithm()),
        policy_algorithm: None,
        children,
    });
    index
}

fn push_set(set: &PolicySet, encoded: &mut Encoded) -> usize {
    let children: Vec<usize> = set
        .children()
        .iter()
        .map(|child| match child {
            PolicyChild::Policy(policy) => push_policy(policy, encoded),
            PolicyChild::Set(nested) => push_set(nested, encoded),
        })
        .collect();
    let index = encoded.blocks.len();
    encoded.blocks.push(EncodedBlock {
        id: set.id().map(str::to_string),
        kind: BlockKind::PolicySet,
        target: set.target().cloned().unwrap_or_default(),
        effect: None,
        obligations: Vec::new(),
        advice: Vec::new(),
        rule_algorithm: None,
        policy_algorithm: Some(set.algorithm()),
        children,
    });
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::Logical;
    use crate::rule::{Advice, Obligation};

    fn grouped_policy() -> Policy {
        Policy::new()
            .with_id("articles")
            .with_target(Target::matching("type", "articles"))
            .with_rule(Rule::new().with_id("id").with_group(RuleGroup::Id))
            .with_rule(Rule::new().with_id("type").with_group(RuleGroup::Type))
            .with_rule(
                Rule::new()
                    .with_id("title")
                    .with_group(RuleGroup::Attribute("title".to_string())),
            )
            .with_rule(
                Rule::new()
                    .with_id("author")
                    .with_group(RuleGroup::ToOne("author".to_string())),
            )
            .with_rule(
                Rule::new()
                    .with_id("tags")
                    .with_group(RuleGroup::ToMany("tags".to_string())),
            )
    }

    #[test]
    fn test_encode_rule_records_envelope() {
        let rule = Rule::new()
            .with_id("r1")
            .with_target(Target::matching("action", "read"))
            .with_effect(Logical::never())
            .with_obligation(Obligation::new(Decision::Deny, |_| {}))
            .with_advice(Advice::new(Decision::Permit, |_| {}));

        let encoded = encode_rule(&rule);
        let root = encoded.root();
        assert_eq!(root.kind, BlockKind::Rule);
        assert_eq!(root.id.as_deref(), Some("r1"));
        assert_eq!(root.effect, Some(false));
        assert_eq!(root.obligations, vec![Decision::Deny]);
        assert_eq!(root.advice, vec![Decision::Permit]);
        assert_eq!(
            encoded.rule_target(encoded.root_index()),
            Some(&Target::matching("action", "read"))
        );
    }

    #[test]
    fn test_encode_policy_group_round_trip() {
        let encoded = encode_policy(&grouped_policy());

        assert_eq!(encoded.id_rule_index(), Some(0));
        assert_eq!(encoded.type_rule_index(), Some(1));
        assert_eq!(
            encoded.attribute_rules_indexes(),
            &[("title".to_string(), 2)]
        );
        assert_eq!(encoded.to_one_rules_indexes(), &[("author".to_string(), 3)]);
        assert_eq!(encoded.to_many_rules_indexes(), &[("tags".to_string(), 4)]);

        // The policy block comes after its rules and references them.
        let root = encoded.root();
        assert_eq!(root.kind, BlockKind::Policy);
        assert_eq!(root.children, vec![0, 1, 2, 3, 4]);
        assert_eq!(root.rule_algorithm, Some(RuleCombiningAlgorithm::DenyOverrides));
    }

    #[test]
    fn test_rule_target_rejects_policy_blocks() {
        let encoded = encode_policy(&grouped_policy());
        let root = encoded.root_index();
        assert!(encoded.rule_target(root).is_none());
        assert!(encoded.policy_target(root).is_some());
        assert!(encoded.policy_target(0).is_none());
    }

    #[test]
    fn test_encode_policy_set_recurses() {
        let set = PolicySet::new()
            .with_id("root")
            .with_child(grouped_policy())
            .with_child(PolicySet::new().with_id("nested").with_child(Policy::new()));

        let encoded = encode_policy_set(&set);
        let root = encoded.root();
        assert_eq!(root.kind, BlockKind::PolicySet);
        assert_eq!(root.id.as_deref(), Some("root"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(
            root.policy_algorithm,
            Some(PolicyCombiningAlgorithm::DenyOverrides)
        );

        // Groupings from the nested policy survive in the shared array.
        assert!(encoded.id_rule_index().is_some());
    }

    #[test]
    fn test_encoded_serde_round_trip() {
        let encoded = encode_policy_set(
            &PolicySet::new()
                .with_id("root")
                .with_child(grouped_policy()),
        );
        let json = serde_json::to_string(&encoded).unwrap();
        let back: Encoded = serde_json::from_str(&json).unwrap();
        assert_eq!(encoded, back);
        assert_eq!(back.attribute_rules_indexes(), encoded.attribute_rules_indexes());
    }
}
