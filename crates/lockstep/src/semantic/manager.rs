use log::{debug, trace};

use lockstep_core::tree::{NodeId, NodeTree};

use crate::{
    notation::RemovalContext,
    resource::{PersistError, Resource},
    semantic::{ExecutionSpecification, Interaction, Lifeline, Message, MessageKind},
};

/// Everything [`SemanticManager::add_message`] created for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSet {
    pub call: Message,
    pub reply: Message,
    /// Execution on the caller's lifeline.
    pub start: ExecutionSpecification,
    /// Execution on the callee's lifeline.
    pub end: ExecutionSpecification,
}

/// Owns the [`Interaction`] for the duration of a batch.
pub struct SemanticManager {
    interaction: Interaction,
    resource: Box<dyn Resource>,
}

impl SemanticManager {
    pub fn new(interaction: Interaction, resource: Box<dyn Resource>) -> Self {
        Self {
            interaction,
            resource,
        }
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Appends a lifeline right of the rightmost one, or at `0` in an empty
    /// interaction. An existing lifeline of the same name is returned as is.
    pub fn add_lifeline(&mut self, name: &str) -> Lifeline {
        if let Some(existing) = self.interaction.lifeline(name) {
            debug!(lifeline = name; "Lifeline already present in model");
            return existing.clone();
        }

        let lifeline = Lifeline::new(name, self.interaction.next_lifeline_x());
        debug!(lifeline = name, x = lifeline.x(); "Adding lifeline to model");
        self.interaction.insert_lifeline(lifeline.clone());
        lifeline
    }

    /// Creates the call/reply pair of `call` and its two executions.
    ///
    /// `reply` must be the reply child of `call`; the interpreter resolves it
    /// before calling.
    pub fn add_message(&mut self, tree: &NodeTree, call: NodeId, reply: NodeId) -> MessageSet {
        let call_node = tree.node(call);
        let reply_node = tree.node(reply);
        let callee = call_node.name();
        let caller = tree
            .parent(call)
            .map_or(callee, |parent| tree.node(parent).name());
        let call_name = call_node.edge().name();
        let reply_name = reply_node.edge().name();

        let index = self.insertion_index(tree, call);
        debug!(message = call_name, index; "Adding message pair to model");

        let call_message = Message::new(call_name, MessageKind::SynchCall, caller, callee);
        let reply_message = Message::new(reply_name, MessageKind::Reply, callee, reply_node.name());
        self.interaction.insert_message(index, call_message.clone());
        self.interaction.insert_message(index + 1, reply_message.clone());

        let start = ExecutionSpecification::new(
            start_execution_name(call_name),
            caller,
            call_name,
            reply_name,
        );
        let end = ExecutionSpecification::new(
            end_execution_name(call_name),
            callee,
            call_name,
            reply_name,
        );
        self.interaction.push_execution(start.clone());
        self.interaction.push_execution(end.clone());

        for fragment in call_node.fragments() {
            self.interaction
                .fragment_mut(fragment.name(), fragment.operator())
                .cover(call_name);
        }

        MessageSet {
            call: call_message,
            reply: reply_message,
            start,
            end,
        }
    }

    /// Removes the call/reply pair of `call` and the executions named in
    /// `context`.
    ///
    /// `context` comes from the notation removal, which has to run first.
    pub fn remove_message(
        &mut self,
        tree: &NodeTree,
        call: NodeId,
        reply: NodeId,
        context: &RemovalContext,
    ) {
        let call_name = tree.node(call).edge().name();
        let reply_name = tree.node(reply).edge().name();

        let mut indices: Vec<usize> = [
            context
                .call_index
                .or_else(|| self.interaction.message_index(call_name)),
            context
                .reply_index
                .or_else(|| self.interaction.message_index(reply_name)),
        ]
        .into_iter()
        .flatten()
        .collect();
        indices.sort_unstable();
        indices.dedup();

        for index in indices.into_iter().rev() {
            if let Some(message) = self.interaction.remove_message_at(index) {
                trace!(message = message.name(), index; "Removed message from model");
            }
        }

        for execution in [&context.start_execution, &context.end_execution] {
            if self.interaction.remove_execution(execution).is_none() {
                debug!(execution = execution.as_str(); "Execution not present in model");
            }
        }

        for fragment in self.interaction.fragments_mut() {
            fragment.uncover(call_name);
        }

        debug!(message = call_name; "Message pair removed from model");
    }

    /// Serializes the interaction and saves it to the resource.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if serialization or the save fails.
    pub fn persist(&mut self) -> Result<(), PersistError> {
        let contents = toml::to_string(&self.interaction)?;
        self.resource.save(&contents)?;
        trace!(resource = self.resource.name(); "Model resource saved");
        Ok(())
    }

    pub fn resource_name(&self) -> &str {
        self.resource.name()
    }

    /// Diagram position right after the left sibling's reply, right after
    /// the parent's call, right before the right sibling, or at the end.
    fn insertion_index(&self, tree: &NodeTree, call: NodeId) -> usize {
        let after = |name: &str| self.interaction.message_index(name).map(|index| index + 1);

        let after_sibling = tree.left_sibling(call).and_then(|sibling| {
            tree.reply_of(sibling)
                .and_then(|reply| after(tree.node(reply).edge().name()))
                .or_else(|| after(tree.node(sibling).edge().name()))
        });

        after_sibling
            .or_else(|| {
                tree.parent(call)
                    .and_then(|parent| after(tree.node(parent).edge().name()))
            })
            .or_else(|| {
                tree.right_sibling(call)
                    .and_then(|sibling| self.interaction.message_index(tree.node(sibling).edge().name()))
            })
            .unwrap_or(self.interaction.messages().len())
    }
}

/// Name of the execution a call opens on the caller's lifeline.
fn start_execution_name(message: &str) -> String {
    format!("{message}.start")
}

/// Name of the execution a call opens on the callee's lifeline.
fn end_execution_name(message: &str) -> String {
    format!("{message}.end")
}
