//! The generation session: upload slots, options, prompt, and view state.
//!
//! [`Studio::generate`] runs one generation cycle: check the subject image,
//! resolve the prompt, enter loading, crop, build the request, call the
//! generator, and publish results or an error message. At most one cycle
//! runs at a time; the in-flight flag is taken before any state changes and
//! released on every exit path, including a dropped future.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::aspect::{crop_to_aspect, AspectRatio};
use crate::error::StudioError;
use crate::ingest::{ingest, RawFile, Upload};
use crate::options::{GenerationOptions, Quality, Style};
use crate::payload::{self, AuxiliaryImages};
use crate::ports::{GenerationResult, ImageGenerator};
use crate::prompt;

/// An upload slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The mandatory subject photo.
    Model,
    /// Product to interact with.
    Product,
    /// Clothing to wear.
    Clothing,
    /// Logo to place.
    Logo,
}

impl Slot {
    /// Lowercase slot name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Product => "product",
            Self::Clothing => "clothing",
            Self::Logo => "logo",
        }
    }
}

/// The four upload slots.
#[derive(Debug, Clone, Default)]
pub struct Uploads {
    /// Subject photo.
    pub model: Option<Upload>,
    /// Product image.
    pub product: Option<Upload>,
    /// Clothing image.
    pub clothing: Option<Upload>,
    /// Logo image.
    pub logo: Option<Upload>,
}

impl Uploads {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Upload> {
        match slot {
            Slot::Model => &mut self.model,
            Slot::Product => &mut self.product,
            Slot::Clothing => &mut self.clothing,
            Slot::Logo => &mut self.logo,
        }
    }

    fn auxiliary(&self) -> AuxiliaryImages {
        AuxiliaryImages {
            product: self.product.clone(),
            clothing: self.clothing.clone(),
            logo: self.logo.clone(),
        }
    }
}

/// What the user sees: loading indicator, results, and the current message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// A generation is in progress.
    pub loading: bool,
    /// Result image locators from the last successful generation.
    pub results: Vec<String>,
    /// The last error or rejection message.
    pub message: Option<String>,
}

/// A copy of the whole session state.
#[derive(Debug, Clone, Default)]
pub struct StudioState {
    /// Upload slots.
    pub uploads: Uploads,
    /// Selected options.
    pub options: GenerationOptions,
    /// Prompt field contents.
    pub prompt: String,
    /// View state.
    pub view: ViewState,
}

/// A single-user generation session bound to one image generator.
pub struct Studio {
    generator: Box<dyn ImageGenerator>,
    state: Mutex<StudioState>,
    in_flight: AtomicBool,
}

/// Holds the in-flight flag for one cycle and clears it, with the loading
/// indicator, when dropped.
struct FlightGuard<'a> {
    studio: &'a Studio,
}

impl<'a> FlightGuard<'a> {
    fn acquire(studio: &'a Studio) -> Option<Self> {
        studio
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { studio })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.studio.lock().view.loading = false;
        self.studio.in_flight.store(false, Ordering::Release);
    }
}

impl Studio {
    /// Create a session with empty slots and the given options.
    pub fn new(generator: Box<dyn ImageGenerator>, options: GenerationOptions) -> Self {
        Self {
            generator,
            state: Mutex::new(StudioState { options, ..StudioState::default() }),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StudioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StudioState {
        self.lock().clone()
    }

    /// Validate `file` and place it in `slot`, replacing any previous upload.
    ///
    /// # Errors
    ///
    /// Returns the ingest error; the message is set and the slot keeps its
    /// previous upload.
    pub fn set_upload(&self, slot: Slot, file: RawFile) -> Result<(), StudioError> {
        let name = file.name.clone();
        match ingest(file) {
            Ok(upload) => {
                tracing::debug!(slot = slot.name(), file = %name, size = upload.file.size(), "upload accepted");
                *self.lock().uploads.slot_mut(slot) = Some(upload);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(slot = slot.name(), file = %name, error = %e, "upload rejected");
                self.lock().view.message = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Empty `slot`, discarding its upload.
    pub fn clear_upload(&self, slot: Slot) {
        *self.lock().uploads.slot_mut(slot) = None;
    }

    /// Select or deselect a style.
    pub fn toggle_style(&self, style: Style, checked: bool) {
        self.lock().options.toggle_style(style, checked);
    }

    /// Choose the quality tier.
    pub fn set_quality(&self, quality: Quality) {
        self.lock().options.quality = quality;
    }

    /// Choose the target aspect ratio.
    pub fn set_aspect(&self, aspect: AspectRatio) {
        self.lock().options.aspect = aspect;
    }

    /// Set the number of images, clamped to `[1, 8]`.
    pub fn set_count(&self, count: i64) {
        self.lock().options.set_count(count);
    }

    /// Replace the prompt field.
    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.lock().prompt = prompt.into();
    }

    /// Fill the prompt field with a synthesized prompt and return it.
    pub fn suggest_prompt(&self) -> String {
        let mut state = self.lock();
        state.prompt = synthesized_prompt(&state);
        state.prompt.clone()
    }

    /// Run one generation cycle.
    ///
    /// # Errors
    ///
    /// - [`StudioError::GenerationInFlight`] if a cycle is already running;
    ///   nothing is changed.
    /// - [`StudioError::MissingRequiredInput`] if there is no subject image;
    ///   only the message is changed and the generator is not called.
    /// - Any crop or generator error; loading ends, results are left empty,
    ///   and the message is set.
    pub async fn generate(&self) -> Result<GenerationResult, StudioError> {
        let Some(_flight) = FlightGuard::acquire(self) else {
            tracing::debug!("generate ignored: a generation is already in progress");
            return Err(StudioError::GenerationInFlight);
        };

        let (model, auxiliary, options, prompt) = {
            let mut state = self.lock();
            let Some(model) = state.uploads.model.clone() else {
                let err = StudioError::MissingRequiredInput(Slot::Model.name());
                state.view.message = Some(err.user_message());
                return Err(err);
            };
            if state.prompt.trim().is_empty() {
                state.prompt = synthesized_prompt(&state);
                tracing::debug!(prompt = %state.prompt, "prompt synthesized");
            }
            state.view.loading = true;
            state.view.results.clear();
            state.view.message = None;
            (model, state.uploads.auxiliary(), state.options.clone(), state.prompt.clone())
        };

        tracing::info!(
            aspect = %options.aspect,
            quality = %options.quality,
            count = options.count(),
            auxiliary = auxiliary.len(),
            "generation started"
        );
        let outcome = self.run_cycle(&model, auxiliary, options, prompt).await;

        let mut state = self.lock();
        state.view.loading = false;
        match outcome {
            Ok(result) => {
                tracing::info!(images = result.urls.len(), "generation finished");
                state.view.results.clone_from(&result.urls);
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                state.view.results.clear();
                state.view.message = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn run_cycle(
        &self,
        model: &Upload,
        auxiliary: AuxiliaryImages,
        options: GenerationOptions,
        prompt: String,
    ) -> Result<GenerationResult, StudioError> {
        let cropped = Upload::derived(crop_to_aspect(&model.file, &options.aspect)?);
        let count = usize::try_from(options.count()).unwrap_or(usize::MAX);
        let request = payload::build(cropped, auxiliary, options, prompt);

        let mut result = self.generator.generate(&request).await?;
        result.urls.truncate(count);
        Ok(result)
    }
}

fn synthesized_prompt(state: &StudioState) -> String {
    let uploads = &state.uploads;
    prompt::synthesize(
        uploads.product.is_some(),
        uploads.clothing.is_some(),
        uploads.logo.is_some(),
        &state.options.styles,
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use image::GenericImageView;
    use tokio::sync::Notify;

    use super::*;
    use crate::ingest::MAX_UPLOAD_BYTES;
    use crate::payload::GenerationRequest;
    use crate::ports::image_generator::GenerateFuture;

    fn png(width: u32, height: u32) -> RawFile {
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        RawFile::new("subject.png", "image/png", buf.into_inner())
    }

    #[derive(Default)]
    struct Recorded {
        calls: AtomicUsize,
        last: Mutex<Option<GenerationRequest>>,
    }

    /// Answers every call with a fixed outcome and records the request.
    struct FakeGenerator {
        recorded: Arc<Recorded>,
        outcome: Result<Vec<String>, String>,
    }

    impl ImageGenerator for FakeGenerator {
        fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
            self.recorded.calls.fetch_add(1, Ordering::SeqCst);
            *self.recorded.last.lock().unwrap() = Some(request.clone());
            let outcome = self.outcome.clone();
            Box::pin(async move {
                outcome.map(|urls| GenerationResult { urls }).map_err(|message| {
                    StudioError::RemoteGenerationFailure { status: 500, message }
                })
            })
        }
    }

    fn studio_with(outcome: Result<Vec<String>, String>) -> (Studio, Arc<Recorded>) {
        let recorded = Arc::new(Recorded::default());
        let generator = FakeGenerator { recorded: Arc::clone(&recorded), outcome };
        (Studio::new(Box::new(generator), GenerationOptions::default()), recorded)
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://img.example/{i}.png")).collect()
    }

    #[tokio::test]
    async fn missing_model_makes_no_call() {
        let (studio, recorded) = studio_with(Ok(urls(2)));

        let err = studio.generate().await.unwrap_err();

        assert!(matches!(err, StudioError::MissingRequiredInput("model")));
        assert_eq!(recorded.calls.load(Ordering::SeqCst), 0);
        let view = studio.snapshot().view;
        assert!(!view.loading);
        assert!(view.message.unwrap().contains("model"));
    }

    #[tokio::test]
    async fn success_publishes_results_bounded_by_count() {
        let (studio, recorded) = studio_with(Ok(urls(5)));
        studio.set_upload(Slot::Model, png(64, 64)).unwrap();
        studio.set_count(3);

        let result = studio.generate().await.unwrap();

        assert_eq!(result.urls, urls(3));
        assert_eq!(recorded.calls.load(Ordering::SeqCst), 1);
        let view = studio.snapshot().view;
        assert!(!view.loading);
        assert_eq!(view.results, urls(3));
        assert!(view.message.is_none());
    }

    #[tokio::test]
    async fn blank_prompt_is_synthesized_and_surfaced() {
        let (studio, recorded) = studio_with(Ok(urls(1)));
        studio.set_upload(Slot::Model, png(32, 32)).unwrap();
        studio.set_upload(Slot::Logo, png(8, 8)).unwrap();
        studio.set_prompt("   ");

        studio.generate().await.unwrap();

        let sent = recorded.last.lock().unwrap().clone().unwrap();
        assert!(sent.prompt.starts_with("người mẫu, thêm logo"));
        assert_eq!(studio.snapshot().prompt, sent.prompt);
    }

    #[tokio::test]
    async fn user_prompt_is_sent_verbatim() {
        let (studio, recorded) = studio_with(Ok(urls(1)));
        studio.set_upload(Slot::Model, png(32, 32)).unwrap();
        studio.set_prompt("on a beach at sunset");

        studio.generate().await.unwrap();

        let sent = recorded.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.prompt, "on a beach at sunset");
    }

    #[tokio::test]
    async fn request_carries_cropped_model_and_present_slots_only() {
        let (studio, recorded) = studio_with(Ok(urls(1)));
        studio.set_upload(Slot::Model, png(192, 108)).unwrap();
        studio.set_upload(Slot::Product, png(8, 8)).unwrap();
        studio.set_aspect(AspectRatio::parse("1:1").unwrap());

        studio.generate().await.unwrap();

        let sent = recorded.last.lock().unwrap().clone().unwrap();
        let cropped = image::load_from_memory(&sent.cropped_model.file.bytes).unwrap();
        assert_eq!(cropped.dimensions(), (108, 108));
        assert_eq!(sent.cropped_model.file.name, "subject.png");
        let roles: Vec<&str> = sent.auxiliary.iter().map(|(role, _)| role).collect();
        assert_eq!(roles, ["product"]);
        // the stored upload is untouched by cropping
        let stored = studio.snapshot().uploads.model.unwrap();
        assert_eq!(image::load_from_memory(&stored.file.bytes).unwrap().dimensions(), (192, 108));
    }

    #[tokio::test]
    async fn remote_failure_clears_results_and_sets_message() {
        let (studio, _) = studio_with(Err("quota exceeded".into()));
        studio.set_upload(Slot::Model, png(16, 16)).unwrap();

        let err = studio.generate().await.unwrap_err();

        assert!(matches!(err, StudioError::RemoteGenerationFailure { .. }));
        let view = studio.snapshot().view;
        assert!(!view.loading);
        assert!(view.results.is_empty());
        assert_eq!(view.message.as_deref(), Some("API error (500): quota exceeded"));
    }

    #[tokio::test]
    async fn empty_remote_message_uses_generic_text() {
        let (studio, _) = studio_with(Err(String::new()));
        studio.set_upload(Slot::Model, png(16, 16)).unwrap();

        let _ = studio.generate().await;

        assert_eq!(
            studio.snapshot().view.message.as_deref(),
            Some(crate::error::GENERIC_FAILURE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn crop_failure_aborts_before_submission_and_clears_old_results() {
        let (studio, recorded) = studio_with(Ok(urls(2)));
        studio.set_upload(Slot::Model, png(16, 16)).unwrap();
        studio.generate().await.unwrap();
        assert_eq!(studio.snapshot().view.results.len(), 2);

        studio
            .set_upload(Slot::Model, RawFile::new("broken.png", "image/png", b"garbage".to_vec()))
            .unwrap();
        let err = studio.generate().await.unwrap_err();

        assert!(matches!(err, StudioError::DecodeFailure(_)));
        assert_eq!(recorded.calls.load(Ordering::SeqCst), 1);
        let view = studio.snapshot().view;
        assert!(!view.loading);
        assert!(view.results.is_empty());
        assert!(view.message.is_some());
    }

    #[test]
    fn oversized_upload_keeps_previous_slot() {
        let (studio, _) = studio_with(Ok(urls(1)));
        studio.set_upload(Slot::Product, png(4, 4)).unwrap();
        let before = studio.snapshot().uploads.product.unwrap();

        let big = RawFile::new("huge.png", "image/png", vec![0; MAX_UPLOAD_BYTES + 1]);
        let err = studio.set_upload(Slot::Product, big).unwrap_err();

        assert!(matches!(err, StudioError::FileTooLarge { .. }));
        let state = studio.snapshot();
        assert_eq!(state.uploads.product.unwrap(), before);
        assert!(state.view.message.is_some());
    }

    #[test]
    fn replacing_or_clearing_a_slot_discards_its_upload() {
        let (studio, _) = studio_with(Ok(urls(1)));
        studio.set_upload(Slot::Logo, png(4, 4)).unwrap();
        studio.set_upload(Slot::Logo, png(6, 6)).unwrap();

        let logo = studio.snapshot().uploads.logo.unwrap();
        assert_eq!(image::load_from_memory(&logo.file.bytes).unwrap().dimensions(), (6, 6));

        studio.clear_upload(Slot::Logo);
        assert!(studio.snapshot().uploads.logo.is_none());
    }

    #[test]
    fn option_edits() {
        let (studio, _) = studio_with(Ok(urls(1)));
        studio.toggle_style(Style::Modern, true);
        studio.set_quality(Quality::TwoK);
        studio.set_count(0);

        let state = studio.snapshot();
        assert!(state.options.styles.contains(&Style::Modern));
        assert_eq!(state.options.quality, Quality::TwoK);
        assert_eq!(state.options.count(), 1);
    }

    #[test]
    fn suggest_prompt_fills_field() {
        let (studio, _) = studio_with(Ok(urls(1)));
        studio.set_upload(Slot::Clothing, png(4, 4)).unwrap();

        let suggested = studio.suggest_prompt();

        assert!(suggested.contains("mặc trang phục được cung cấp"));
        assert_eq!(studio.snapshot().prompt, suggested);
    }

    #[derive(Default)]
    struct Gate {
        calls: AtomicUsize,
        started: Notify,
        release: Notify,
    }

    /// Blocks inside `generate` until the test releases it.
    struct GatedGenerator(Arc<Gate>);

    impl ImageGenerator for GatedGenerator {
        fn generate(&self, _request: &GenerationRequest) -> GenerateFuture<'_> {
            Box::pin(async move {
                self.0.calls.fetch_add(1, Ordering::SeqCst);
                self.0.started.notify_one();
                self.0.release.notified().await;
                Ok(GenerationResult { urls: vec!["https://img.example/a.png".into()] })
            })
        }
    }

    #[tokio::test]
    async fn second_generate_while_pending_is_rejected() {
        let gate = Arc::new(Gate::default());
        let studio =
            Studio::new(Box::new(GatedGenerator(Arc::clone(&gate))), GenerationOptions::default());
        studio.set_upload(Slot::Model, png(16, 16)).unwrap();

        let first = studio.generate();
        let second = async {
            gate.started.notified().await;
            let view = studio.snapshot().view;
            assert!(view.loading);
            assert!(view.results.is_empty());
            let rejected = studio.generate().await;
            gate.release.notify_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().urls.len(), 1);
        assert!(matches!(second, Err(StudioError::GenerationInFlight)));
        assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
        assert!(!studio.snapshot().view.loading);

        // the guard is released once the cycle completes
        gate.release.notify_one();
        studio.generate().await.unwrap();
        assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_cycle_releases_the_guard() {
        let gate = Arc::new(Gate::default());
        let studio =
            Studio::new(Box::new(GatedGenerator(Arc::clone(&gate))), GenerationOptions::default());
        studio.set_upload(Slot::Model, png(16, 16)).unwrap();

        {
            let pending = studio.generate();
            tokio::pin!(pending);
            tokio::select! {
                _ = &mut pending => panic!("generation should still be pending"),
                () = gate.started.notified() => {}
            }
        }

        assert!(!studio.snapshot().view.loading);
        gate.release.notify_one();
        assert!(studio.generate().await.is_ok());
    }
}
