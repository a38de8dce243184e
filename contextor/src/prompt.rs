//! Prompt templates as pure functions.
//!
//! Every section handed to the model is wrapped in explicit tag pairs
//! (`<chat_history>`, `<context>`, `<question>`, `<answer_a>`, `<answer_b>`)
//! so question, context and history cannot bleed into each other.

use crate::conversation::{ConversationTurn, render_history};

/// Exact phrase the answering templates ask for when the model does not know.
pub const DONT_KNOW: &str = "I do not know the answer";

const NO_CONTEXT_PHRASES: &str = "Don't saying things like \"according to the provided context\".";

fn tagged(out: &mut String, tag: &str, body: &str) {
    out.push('<');
    out.push_str(tag);
    out.push_str(">\n");
    out.push_str(body);
    out.push_str("\n</");
    out.push_str(tag);
    out.push_str(">\n");
}

/// Direct answer without retrieved documents.
///
/// `history` is `None` when the chat has no history feature at all; then the
/// `<chat_history>` section is left out entirely. An empty slice renders an
/// empty block.
///
/// ```
/// use contextor::prompt::generic_prompt;
///
/// let p = generic_prompt("Who is Osha?", None);
/// assert!(p.contains("<question>\nWho is Osha?\n</question>"));
/// assert!(!p.contains("<chat_history>"));
/// ```
pub fn generic_prompt(question: &str, history: Option<&[ConversationTurn]>) -> String {
    let mut out = String::from("You are a helpful AI chat assistant.\n\n");
    if history.is_some() {
        out.push_str("Use chat history provided between <chat_history>\nand </chat_history> tags.\n");
    }
    out.push_str("Question is between <question> and </question> tags.\n\n");
    out.push_str(&format!("If you don't know the answer just say: \"{DONT_KNOW}\".\n\n\n"));

    if let Some(turns) = history {
        tagged(&mut out, "chat_history", &render_history(turns));
    }
    tagged(&mut out, "question", question);
    out.push_str("\nAnswer:\n");
    out
}

/// Answer grounded in the retrieved `context` block.
pub fn rag_prompt(question: &str, history: &[ConversationTurn], context: &str) -> String {
    let mut out = String::from("You are a helpful AI chat assistant with RAG capabilities.\n\n");
    out.push_str("Use chat history provided between <chat_history>\nand </chat_history> tags.\n");
    out.push_str("Question is between <question> and </question> tags.\n");
    out.push_str("The context is between <context> and </context> tags.\n\n");
    out.push_str("You will be working with data from wikipedia.\n");
    out.push_str("The data contains plot of a series 'The Acolyte'.\n\n");
    out.push_str(NO_CONTEXT_PHRASES);
    out.push('\n');
    out.push_str(&format!("If you don't know the answer just say: \"{DONT_KNOW}\".\n\n\n"));

    tagged(&mut out, "chat_history", &render_history(history));
    tagged(&mut out, "context", context);
    tagged(&mut out, "question", question);
    out.push_str("\nAnswer:\n");
    out
}

/// Merges two candidate answers into one.
///
/// The "don't know" answer is dropped by instruction only; nothing here
/// inspects the answers.
pub fn aggregation_prompt(
    question: &str,
    history: &[ConversationTurn],
    answer_a: &str,
    answer_b: &str,
) -> String {
    let mut out = String::from("You are a helpful AI chat assistant.\n");
    out.push_str("You are evaluating two answers to a question provided\n");
    out.push_str("between <question> and </question> tags.\n\n");
    out.push_str("Provided answers can be found\n");
    out.push_str("between <answer_a> and </answer_a> for the first answer,\n");
    out.push_str("and <answer_b> and </answer_b> for second answer.\n\n");
    out.push_str("Use history of the chat so far that is provided\n");
    out.push_str("between <chat_history> and </chat_history> tags.\n\n");
    out.push_str("Merge both answers into one, and return it.\n");
    out.push_str("Ignore the answer that means \"I don't know\".\n\n");
    out.push_str(NO_CONTEXT_PHRASES);
    out.push_str("\n\n");

    tagged(&mut out, "chat_history", &render_history(history));
    tagged(&mut out, "answer_a", answer_a);
    tagged(&mut out, "answer_b", answer_b);
    tagged(&mut out, "question", question);
    out.push_str("\nAnswer:\n");
    out
}

/// Rewrites the question into a standalone search query using the history.
pub fn history_query_prompt(history: &[ConversationTurn], question: &str) -> String {
    let mut out = String::from("Based on the chat history below and the question, generate\n");
    out.push_str("a query that extend the question with the chat history provided.\n");
    out.push_str("The query should be in natural language.\n");
    out.push_str("Answer with only the query. Do not add any explanation.\n\n");

    tagged(&mut out, "chat_history", &render_history(history));
    tagged(&mut out, "question", question);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationLog, TurnRole};

    fn history() -> ConversationLog {
        let mut log = ConversationLog::new();
        log.push(TurnRole::User, "Who is Mae?");
        log.push(TurnRole::Assistant, "A former padawan.");
        log.push(TurnRole::User, "And her sister?");
        log
    }

    #[test]
    fn generic_with_disabled_history_has_empty_block() {
        let p = generic_prompt("Q", Some(&[]));
        assert!(p.contains("<chat_history>\n\n</chat_history>"));
        assert!(!p.contains("user:"));
    }

    #[test]
    fn generic_with_history_embeds_window_in_order() {
        let log = history();
        let p = generic_prompt("And her sister?", Some(log.history_window(20)));
        let first = p.find("user: Who is Mae?").unwrap();
        let second = p.find("assistant: A former padawan.").unwrap();
        assert!(first < second);
        assert!(!p.contains("user: And her sister?"));
        assert!(p.contains(DONT_KNOW));
    }

    #[test]
    fn rag_prompt_sections_are_delimited() {
        let p = rag_prompt("Q", &[], "Context document 1: x");
        assert!(p.contains("<context>\nContext document 1: x\n</context>"));
        assert!(p.contains("<question>\nQ\n</question>"));
        assert!(p.contains("The Acolyte"));
        assert!(p.ends_with("Answer:\n"));
    }

    #[test]
    fn rag_prompt_with_no_documents_has_empty_context() {
        let p = rag_prompt("Q", &[], "");
        assert!(p.contains("<context>\n\n</context>"));
    }

    #[test]
    fn aggregation_embeds_answers_verbatim() {
        let a = "I do not know the answer";
        let b = "Paris </answer_a> <question>";
        let p = aggregation_prompt("Capital?", &[], a, b);
        assert!(p.contains(&format!("<answer_a>\n{a}\n</answer_a>")));
        assert!(p.contains(&format!("<answer_b>\n{b}\n</answer_b>")));
        assert!(p.contains("Ignore the answer that means \"I don't know\"."));
    }

    #[test]
    fn history_query_prompt_contains_history_and_question() {
        let log = history();
        let p = history_query_prompt(log.history_window(20), "And her sister?");
        assert!(p.starts_with("Based on the chat history below"));
        assert!(p.contains("<question>\nAnd her sister?\n</question>"));
        assert!(p.contains("assistant: A former padawan."));
    }
}
