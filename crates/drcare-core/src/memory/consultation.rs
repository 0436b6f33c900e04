//! Consultation handler: one request from prompt to memory update.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::ConsultationModels;
use crate::error::{DrCareError, DrCareResult};
use crate::memory::prompts::{
    consultation_note, consultation_system_prompt, history_line, image_analysis_note,
    image_data_uri, should_promote, IMAGE_ANALYSIS_INSTRUCTION,
};
use crate::memory::store::ContextStore;
use crate::traits::{GenerationOptions, Llm};
use crate::types::{ContentPart, Message};

/// Runs text and image consultations against a shared [`ContextStore`].
///
/// Failures never escape the public entry points: they come back as an
/// `"Error: ..."` reply and leave the user's record untouched.
pub struct ConsultationHandler {
    store: Arc<ContextStore>,
    llm: Arc<dyn Llm>,
    models: ConsultationModels,
}

impl ConsultationHandler {
    /// Create a new handler.
    pub fn new(store: Arc<ContextStore>, llm: Arc<dyn Llm>, models: ConsultationModels) -> Self {
        Self { store, llm, models }
    }

    /// The store this handler reads and updates.
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// The inference provider.
    pub fn llm(&self) -> &Arc<dyn Llm> {
        &self.llm
    }

    /// Models used by the two flows.
    pub fn models(&self) -> &ConsultationModels {
        &self.models
    }

    /// Render a failure as a reply.
    pub fn error_reply(err: &DrCareError) -> String {
        format!("Error: {}", err)
    }

    /// Answer a free-text question, returning the reply or an error string.
    pub async fn consult(&self, user_name: &str, text: &str) -> String {
        match self.try_consult(user_name, text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    user_name = %user_name,
                    code = e.code().as_str(),
                    error = %e,
                    suggestion = e.suggestion().unwrap_or_default(),
                    "Consultation failed"
                );
                Self::error_reply(&e)
            }
        }
    }

    /// Answer a free-text question.
    #[instrument(skip(self, text), fields(model = %self.models.text_model))]
    pub async fn try_consult(&self, user_name: &str, text: &str) -> DrCareResult<String> {
        let memory = self.store.get_or_create(user_name).await;
        let context = self.store.read_context(&memory).await;

        let messages = vec![
            Message::system(consultation_system_prompt(&context, text)),
            Message::user(text),
        ];

        let reply = self
            .llm
            .generate(
                &messages,
                Some(GenerationOptions::with_model(&self.models.text_model)),
            )
            .await?
            .into_text()?;

        let promoted = should_promote(text);
        self.store
            .update(&memory, |record| {
                record.history.push(history_line(text, &reply));
                if promoted {
                    record.context.push_str(&consultation_note(text));
                }
            })
            .await;

        info!(user_name = %user_name, promoted, "Consultation completed");
        Ok(reply)
    }

    /// Analyze an uploaded image, returning the analysis or an error string.
    pub async fn analyze_image(&self, user_name: &str, filename: &str, image: &[u8]) -> String {
        match self.try_analyze_image(user_name, filename, image).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(
                    user_name = %user_name,
                    filename = %filename,
                    code = e.code().as_str(),
                    error = %e,
                    suggestion = e.suggestion().unwrap_or_default(),
                    "Image analysis failed"
                );
                Self::error_reply(&e)
            }
        }
    }

    /// Analyze an uploaded image. Every successful analysis is added to the
    /// user's context.
    #[instrument(skip(self, image), fields(model = %self.models.vision_model, bytes = image.len()))]
    pub async fn try_analyze_image(
        &self,
        user_name: &str,
        filename: &str,
        image: &[u8],
    ) -> DrCareResult<String> {
        let memory = self.store.get_or_create(user_name).await;

        let messages = vec![Message::user(vec![
            ContentPart::text(IMAGE_ANALYSIS_INSTRUCTION),
            ContentPart::image_url(image_data_uri(image)),
        ])];

        let analysis = self
            .llm
            .generate(
                &messages,
                Some(GenerationOptions::with_model(&self.models.vision_model)),
            )
            .await?
            .into_text()?;

        self.store
            .update(&memory, |record| {
                record
                    .context
                    .push_str(&image_analysis_note(filename, &analysis))
            })
            .await;

        info!(user_name = %user_name, filename = %filename, "Image analysis completed");
        Ok(analysis)
    }

    /// Reply for an upload whose payload could not be read.
    ///
    /// The user is still registered, matching a normal image request, but
    /// nothing is recorded.
    pub async fn reject_upload(&self, user_name: &str, err: DrCareError) -> String {
        self.store.get_or_create(user_name).await;
        warn!(
            user_name = %user_name,
            code = err.code().as_str(),
            error = %err,
            suggestion = err.suggestion().unwrap_or_default(),
            "Unreadable upload"
        );
        Self::error_reply(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LlmResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and answers with a fixed reply.
    struct RecordingLlm {
        reply: Option<String>,
        calls: Mutex<Vec<(Vec<Message>, Option<String>)>>,
    }

    impl RecordingLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Llm for RecordingLlm {
        async fn generate(
            &self,
            messages: &[Message],
            options: Option<GenerationOptions>,
        ) -> DrCareResult<LlmResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.and_then(|o| o.model)));
            Ok(LlmResponse {
                content: self.reply.clone(),
                ..Default::default()
            })
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn handler(llm: Arc<RecordingLlm>) -> ConsultationHandler {
        ConsultationHandler::new(
            Arc::new(ContextStore::new()),
            llm,
            ConsultationModels::default(),
        )
    }

    #[tokio::test]
    async fn test_text_flow_sends_system_and_user_messages() {
        let llm = Arc::new(RecordingLlm::replying("Rest."));
        let handler = handler(Arc::clone(&llm));

        handler.consult("alice", "I have a headache").await;

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (messages, model) = &calls[0];
        assert_eq!(model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, crate::types::MessageRole::System);
        assert!(messages[0]
            .content
            .text()
            .contains("No previous records available."));
        assert_eq!(messages[1], Message::user("I have a headache"));
    }

    #[tokio::test]
    async fn test_text_flow_replays_context() {
        let llm = Arc::new(RecordingLlm::replying("Ok."));
        let handler = handler(Arc::clone(&llm));

        handler.consult("alice", "Is this medicine safe?").await;
        handler.consult("alice", "Thanks").await;

        let calls = llm.calls.lock().unwrap();
        let second_prompt = calls[1].0[0].content.text();
        assert!(second_prompt.contains("- Consultation Note: Is this medicine safe?"));
        assert!(!second_prompt.contains("No previous records available."));
    }

    #[tokio::test]
    async fn test_image_flow_builds_single_multipart_message() {
        let llm = Arc::new(RecordingLlm::replying("Clear."));
        let handler = handler(Arc::clone(&llm));

        handler.analyze_image("bob", "scan.png", b"\x89PNG").await;

        let calls = llm.calls.lock().unwrap();
        let (messages, model) = &calls[0];
        assert_eq!(
            model.as_deref(),
            Some("meta-llama/llama-4-scout-17b-16e-instruct")
        );
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            Message::user(vec![
                ContentPart::text(IMAGE_ANALYSIS_INSTRUCTION),
                ContentPart::image_url("data:image/jpeg;base64,iVBORw=="),
            ])
        );
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let llm = Arc::new(RecordingLlm::empty());
        let handler = handler(llm);

        let reply = handler.consult("erin", "what medicine?").await;
        assert_eq!(reply, "Error: LLM error: Model returned no content");

        let record = handler.store().snapshot("erin").await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_reject_upload_registers_user_without_mutation() {
        let handler = handler(Arc::new(RecordingLlm::replying("unused")));

        let reply = handler
            .reject_upload("frank", DrCareError::upload("stream closed"))
            .await;
        assert_eq!(reply, "Error: Upload error: stream closed");

        let record = handler.store().snapshot("frank").await.unwrap();
        assert!(record.is_empty());
    }
}
