use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    application::services::{CompletionModel, RetrievalIndex},
    domain::{AnswerContext, ChatPrompt, DomainError},
    settings::RetrievalSettings,
};

/// Returned when retrieval finds nothing; the completion model is not called.
pub const NO_DATA_MESSAGE: &str = "No data found. Ingest images first.";

const SYSTEM_INSTRUCTION: &str = "You are a planetary science assistant. Answer the user's \
question using only the Mars image descriptions provided below. Mention the image URLs you \
rely on. If the descriptions do not contain the answer, say so.";

/// Retrieval-augmented answering over stored image descriptions.
pub struct RetrievalAnswerer {
    index: Arc<dyn RetrievalIndex>,
    completion: Arc<dyn CompletionModel>,
    top_k: usize,
    delimiter: String,
}

impl RetrievalAnswerer {
    pub fn new(
        index: Arc<dyn RetrievalIndex>,
        completion: Arc<dyn CompletionModel>,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            index,
            completion,
            top_k: settings.answer_top_k.max(1),
            delimiter: settings.context_delimiter.clone(),
        }
    }

    pub fn answer(&self, question: &str) -> Result<String, DomainError> {
        let query = question.trim();
        if query.is_empty() {
            return Err(DomainError::validation("question cannot be empty"));
        }

        let entries = self.index.similarity_search(query, self.top_k, None)?;
        if entries.is_empty() {
            info!(target: "marsrag::ask", "no indexed descriptions; skipping completion");
            return Ok(NO_DATA_MESSAGE.to_string());
        }

        let context = AnswerContext::from_entries(entries);
        debug!(
            target: "marsrag::ask",
            top_k = self.top_k,
            retrieved = context.len(),
            urls = ?context.urls().collect::<Vec<_>>(),
            "context assembled"
        );

        self.completion.complete(&self.build_prompt(&context, question))
    }

    /// System turn carrying the rendered context, then the question verbatim.
    pub fn build_prompt(&self, context: &AnswerContext, question: &str) -> ChatPrompt {
        ChatPrompt::new()
            .system(format!(
                "{SYSTEM_INSTRUCTION}\n\nContext:\n{}",
                context.render(&self.delimiter)
            ))
            .user(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{memory_index, FakeCompletion, FlakyIndex};
    use crate::domain::{ChatRole, EntryMetadata};

    fn answerer(
        index: Arc<dyn RetrievalIndex>,
        completion: Arc<FakeCompletion>,
    ) -> RetrievalAnswerer {
        RetrievalAnswerer::new(index, completion, &RetrievalSettings::default())
    }

    #[test]
    fn empty_index_returns_sentinel_without_calling_model() {
        let completion = Arc::new(FakeCompletion::replying("should not be used"));
        let answer = answerer(memory_index(), completion.clone())
            .answer("What do the dunes look like?")
            .unwrap();

        assert_eq!(answer, NO_DATA_MESSAGE);
        assert!(completion.prompts().is_empty());
    }

    #[test]
    fn context_holds_top_three_in_rank_order_and_reply_is_raw() {
        let index = memory_index();
        let docs = [
            ("https://img/crater-1.jpg", "Recent crater images show a fresh crater with bright ejecta"),
            ("https://img/crater-2.jpg", "Crater images of a degraded crater with layered walls"),
            ("https://img/crater-3.jpg", "Recent images of a small crater cluster"),
            ("https://img/dunes.jpg", "Dark sand dunes rippled by wind"),
        ];
        for (url, description) in docs {
            index
                .add(description, EntryMetadata::for_image(url, "catalog"))
                .unwrap();
        }

        let raw_reply = "  Crater answer with *markdown*\n";
        let completion = Arc::new(FakeCompletion::replying(raw_reply));
        let answerer = answerer(index.clone(), completion.clone());
        let question = "Describe recent crater images";

        let answer = answerer.answer(question).unwrap();
        assert_eq!(answer, raw_reply);

        let expected = AnswerContext::from_entries(
            index.similarity_search(question, 3, None).unwrap(),
        );
        assert_eq!(expected.len(), 3);
        assert!(expected.urls().all(|url| url.contains("crater")));

        let prompts = completion.prompts();
        assert_eq!(prompts.len(), 1);
        let messages = prompts[0].messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.ends_with(&expected.render("\n---\n")));
        assert!(!messages[0].content.contains("dunes.jpg"));
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, question);
    }

    #[test]
    fn user_turn_keeps_the_question_untouched() {
        let index = memory_index();
        index
            .add(
                "Layered sediment in Gale crater",
                EntryMetadata::for_image("https://img/gale.jpg", "catalog"),
            )
            .unwrap();
        let completion = Arc::new(FakeCompletion::replying("layers"));
        let question = "  Where is the layered sediment?\n";

        answerer(index, completion.clone()).answer(question).unwrap();

        let prompts = completion.prompts();
        assert_eq!(prompts[0].messages()[1].content, question);
    }

    #[test]
    fn index_failure_propagates() {
        let completion = Arc::new(FakeCompletion::replying("unused"));
        let index = Arc::new(FlakyIndex::failing_searches(memory_index()));

        let result = answerer(index, completion.clone()).answer("anything");

        assert!(matches!(result, Err(DomainError::Index(_))));
        assert!(completion.prompts().is_empty());
    }

    #[test]
    fn completion_failure_propagates() {
        let index = memory_index();
        index
            .add(
                "crater",
                EntryMetadata::for_image("https://img/c.jpg", "catalog"),
            )
            .unwrap();

        let result = answerer(index, Arc::new(FakeCompletion::failing("timeout"))).answer("crater?");
        assert!(matches!(result, Err(DomainError::Completion(_))));
    }

    #[test]
    fn blank_question_is_rejected() {
        let result = answerer(memory_index(), Arc::new(FakeCompletion::replying("x"))).answer("  ");
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
