//! Synthesizes tool definitions for an agent's declared handoffs, and
//! classifies tool calls the loop receives back against them.

use crate::agent::{Agent, Handoff};
use crate::tool::{ParamField, ParamType, ToolDefinition};

/// Lowercases and replaces spaces/hyphens with underscores. Deliberately
/// nothing fancier (no Unicode case folding, no acronym handling) — this
/// only ever runs on agent names the embedder chose.
pub fn snake_case(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn default_tool_name(target_agent_name: &str) -> String {
    snake_case(&format!("transfer_to_{target_agent_name}"))
}

/// Builds the tool definition the model sees for one handoff declaration.
pub fn handoff_tool_definition(handoff: &Handoff) -> ToolDefinition {
    let name = handoff
        .tool_name
        .clone()
        .unwrap_or_else(|| default_tool_name(&handoff.target_agent_name));
    let description = handoff.tool_description.clone().unwrap_or_else(|| {
        format!(
            "Handoff to the {} agent to handle the request.",
            handoff.target_agent_name
        )
    });
    // `prompt` is optional context for the receiving agent; the loop never
    // dispatches this tool, it only reads `prompt` back out of the call.
    ToolDefinition::new(
        name,
        description,
        &[ParamField::new("prompt", ParamType::String)
            .described("Optional context to hand to the receiving agent.")],
    )
}

/// All synthesized handoff tool definitions for an agent, in declaration order.
pub fn synthesize_handoff_tools(agent: &Agent) -> Vec<ToolDefinition> {
    agent.handoffs.iter().map(handoff_tool_definition).collect()
}

/// Reads the optional `prompt` argument back out of a handoff call.
pub fn extract_prompt(arguments: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(arguments)
        .ok()
        .and_then(|v| v.get("prompt").and_then(|p| p.as_str().map(str::to_string)))
}

/// Maps a tool-call name back to the handoff it was synthesized from, if any.
pub fn resolve_handoff<'a>(agent: &'a Agent, tool_call_name: &str) -> Option<&'a Handoff> {
    agent.handoffs.iter().find(|h| {
        let name = h
            .tool_name
            .clone()
            .unwrap_or_else(|| default_tool_name(&h.target_agent_name));
        name == tool_call_name
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ModelConfig;

    #[test]
    fn snake_case_lowercases_and_replaces_separators() {
        assert_eq!(snake_case("Billing Agent"), "billing_agent");
        assert_eq!(snake_case("refund-bot"), "refund_bot");
        assert_eq!(snake_case("AlreadyLower"), "alreadylower");
    }

    #[test]
    fn default_tool_name_is_transfer_prefixed() {
        assert_eq!(default_tool_name("Billing Agent"), "transfer_to_billing_agent");
    }

    #[test]
    fn explicit_tool_name_overrides_default() {
        let handoff = Handoff::to("billing").with_tool_name("go_to_billing");
        let def = handoff_tool_definition(&handoff);
        assert_eq!(def.name, "go_to_billing");
    }

    #[test]
    fn resolve_handoff_matches_synthesized_name() {
        let agent = Agent::new("triage", "route the user", ModelConfig::new("gpt-4o-mini"))
            .with_handoff(Handoff::to("billing"));
        let resolved = resolve_handoff(&agent, "transfer_to_billing");
        assert!(resolved.is_some());
        assert_eq!(resolved.unwrap().target_agent_name, "billing");
    }

    #[test]
    fn resolve_handoff_returns_none_for_unrelated_tool() {
        let agent = Agent::new("triage", "route the user", ModelConfig::new("gpt-4o-mini"))
            .with_handoff(Handoff::to("billing"));
        assert!(resolve_handoff(&agent, "get_weather").is_none());
    }
}
