//! Prompt templates used by the three roles.

/// Decomposition instruction sent to the engine for each user request.
pub fn decomposition(request: &str) -> String {
    format!(
        "You are the Planner. Break the user's objective into a minimal ordered list of atomic subtasks.\n\
         Only output strict JSON with this schema:\n\
         {{\"subtasks\": [\"step 1\", \"step 2\", \"...\"]}}\n\n\
         If a step needs retrieval from the knowledge base, include the word RAG in it.\n\
         If a step is pure reasoning/summarization, include the word SUMMARIZE.\n\n\
         Objective: {}",
        request
    )
}

pub const WORKER_SYSTEM: &str = "You are a Worker Agent.\n\
You execute the subtask assigned to you using the tools provided.\n\
Return ONLY the final result for this subtask.\n\
Always follow the ReAct format:\n\n\
Thought: reasoning\n\
Action: tool_name\n\
Action Input: the input\n\
Observation: tool output\n\
Final Answer: the final completed subtask output";

pub const VERIFIER_SYSTEM: &str = "You are the Verifier Agent.\n\
Your job is to check the combined worker outputs for correctness, completeness, and clarity.\n\
If errors or gaps are found, fix them in the final answer.\n\
Always follow the ReAct format:\n\n\
Thought: reasoning\n\
Action: tool_name (if needed, else skip)\n\
Action Input: the input\n\
Observation: tool output\n\
Final Answer: the verified and corrected result";

/// Cleanup instruction applied to each worker result.
pub fn verification(text: &str) -> String {
    format!(
        "Clean up and verify this result for correctness and clarity. If unclear, improve it.\n\n{}",
        text
    )
}

/// Full ReAct prompt: system text, tool listing, the question, and the
/// scratchpad of prior steps.
pub fn react(system: &str, tools: &str, tool_names: &str, question: &str, scratchpad: &str) -> String {
    format!(
        "{}\n\n\
         You can use the following tools:\n{}\n\n\
         Tool names: {}\n\n\
         Question: {}\n\
         {}",
        system, tools, tool_names, question, scratchpad
    )
}
