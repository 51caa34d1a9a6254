//! Abstract interaction model: lifelines, messages, executions and fragments.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use lockstep_core::{geometry::LIFELINE_SPACING, tree::FragmentOperator};

/// A participant of the interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifeline {
    name: String,
    x: i32,
}

impl Lifeline {
    pub fn new(name: impl Into<String>, x: i32) -> Self {
        Self {
            name: name.into(),
            x,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Horizontal position.
    pub fn x(&self) -> i32 {
        self.x
    }
}

/// Sort of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    SynchCall,
    Reply,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SynchCall => f.write_str("synch_call"),
            Self::Reply => f.write_str("reply"),
        }
    }
}

/// A message between two lifelines. Its position in
/// [`Interaction::messages`] is its diagram order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    name: String,
    kind: MessageKind,
    sender: String,
    receiver: String,
}

impl Message {
    pub fn new(
        name: impl Into<String>,
        kind: MessageKind,
        sender: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }
}

/// The active period of a lifeline, opened by `start_message` and closed by
/// `finish_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSpecification {
    name: String,
    lifeline: String,
    start_message: String,
    finish_message: String,
}

impl ExecutionSpecification {
    pub fn new(
        name: impl Into<String>,
        lifeline: impl Into<String>,
        start_message: impl Into<String>,
        finish_message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            lifeline: lifeline.into(),
            start_message: start_message.into(),
            finish_message: finish_message.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifeline(&self) -> &str {
        &self.lifeline
    }

    pub fn start_message(&self) -> &str {
        &self.start_message
    }

    pub fn finish_message(&self) -> &str {
        &self.finish_message
    }
}

/// A combined fragment and the call messages it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedFragment {
    name: String,
    operator: FragmentOperator,
    #[serde(default)]
    covered: Vec<String>,
}

impl CombinedFragment {
    pub fn new(name: impl Into<String>, operator: FragmentOperator) -> Self {
        Self {
            name: name.into(),
            operator,
            covered: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> FragmentOperator {
        self.operator
    }

    /// Names of the call messages inside this fragment.
    pub fn covered(&self) -> &[String] {
        &self.covered
    }

    pub(crate) fn cover(&mut self, message: &str) {
        if !self.covered.iter().any(|covered| covered == message) {
            self.covered.push(message.to_string());
        }
    }

    pub(crate) fn uncover(&mut self, message: &str) {
        self.covered.retain(|covered| covered != message);
    }
}

/// The semantic model of one sequence diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    name: String,
    #[serde(default)]
    lifelines: IndexMap<String, Lifeline>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    executions: Vec<ExecutionSpecification>,
    #[serde(default)]
    fragments: Vec<CombinedFragment>,
}

impl Interaction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifelines in creation order.
    pub fn lifelines(&self) -> impl Iterator<Item = &Lifeline> {
        self.lifelines.values()
    }

    pub fn lifeline(&self, name: &str) -> Option<&Lifeline> {
        self.lifelines.get(name)
    }

    /// Messages in diagram order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of synchronous calls, replies not included.
    pub fn call_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.kind() == MessageKind::SynchCall)
            .count()
    }

    /// Diagram position of the first message named `name`.
    pub fn message_index(&self, name: &str) -> Option<usize> {
        self.messages.iter().position(|message| message.name() == name)
    }

    pub fn executions(&self) -> &[ExecutionSpecification] {
        &self.executions
    }

    pub fn execution(&self, name: &str) -> Option<&ExecutionSpecification> {
        self.executions.iter().find(|execution| execution.name() == name)
    }

    pub fn fragments(&self) -> &[CombinedFragment] {
        &self.fragments
    }

    pub fn fragment(&self, name: &str) -> Option<&CombinedFragment> {
        self.fragments.iter().find(|fragment| fragment.name() == name)
    }

    /// Position for the next lifeline: right of the rightmost one.
    pub(crate) fn next_lifeline_x(&self) -> i32 {
        self.lifelines
            .values()
            .map(Lifeline::x)
            .max()
            .map_or(0, |x| x + LIFELINE_SPACING)
    }

    pub(crate) fn insert_lifeline(&mut self, lifeline: Lifeline) {
        self.lifelines.insert(lifeline.name().to_string(), lifeline);
    }

    pub(crate) fn insert_message(&mut self, index: usize, message: Message) {
        let index = index.min(self.messages.len());
        self.messages.insert(index, message);
    }

    pub(crate) fn remove_message_at(&mut self, index: usize) -> Option<Message> {
        (index < self.messages.len()).then(|| self.messages.remove(index))
    }

    pub(crate) fn push_execution(&mut self, execution: ExecutionSpecification) {
        self.executions.push(execution);
    }

    pub(crate) fn remove_execution(&mut self, name: &str) -> Option<ExecutionSpecification> {
        let index = self.executions.iter().position(|execution| execution.name() == name)?;
        Some(self.executions.remove(index))
    }

    /// Returns the fragment named `name`, creating it when missing.
    pub(crate) fn fragment_mut(
        &mut self,
        name: &str,
        operator: FragmentOperator,
    ) -> &mut CombinedFragment {
        let index = match self.fragments.iter().position(|fragment| fragment.name() == name) {
            Some(index) => index,
            None => {
                self.fragments.push(CombinedFragment::new(name, operator));
                self.fragments.len() - 1
            }
        };
        &mut self.fragments[index]
    }

    pub(crate) fn fragments_mut(&mut self) -> impl Iterator<Item = &mut CombinedFragment> {
        self.fragments.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_lifeline_x() {
        let mut interaction = Interaction::new("demo");
        assert_eq!(interaction.next_lifeline_x(), 0);

        interaction.insert_lifeline(Lifeline::new("A", 0));
        interaction.insert_lifeline(Lifeline::new("B", 150));
        assert_eq!(interaction.next_lifeline_x(), 300);
    }

    #[test]
    fn test_insert_message_clamps_index() {
        let mut interaction = Interaction::new("demo");
        interaction.insert_message(5, Message::new("a", MessageKind::SynchCall, "A", "B"));
        interaction.insert_message(0, Message::new("b", MessageKind::SynchCall, "A", "B"));

        let names: Vec<&str> = interaction.messages().iter().map(Message::name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(interaction.message_index("a"), Some(1));
        assert_eq!(interaction.call_count(), 2);
        assert!(interaction.remove_message_at(7).is_none());
    }

    #[test]
    fn test_fragment_mut_creates_once() {
        let mut interaction = Interaction::new("demo");
        interaction.fragment_mut("retry", FragmentOperator::Loop).cover("load");
        interaction.fragment_mut("retry", FragmentOperator::Loop).cover("load");
        interaction.fragment_mut("retry", FragmentOperator::Loop).cover("save");

        assert_eq!(interaction.fragments().len(), 1);
        assert_eq!(interaction.fragment("retry").unwrap().covered(), &["load", "save"]);
    }

    #[test]
    fn test_interaction_toml_round_trip() {
        let mut interaction = Interaction::new("demo");
        interaction.insert_lifeline(Lifeline::new("A", 0));
        interaction.insert_message(0, Message::new("a", MessageKind::SynchCall, "A", "A"));
        interaction.push_execution(ExecutionSpecification::new("a.start", "A", "a", "aReturn"));

        let text = toml::to_string(&interaction).unwrap();
        let back: Interaction = toml::from_str(&text).unwrap();
        assert_eq!(back, interaction);
    }
}
