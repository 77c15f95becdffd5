use serde::{Deserialize, Serialize};

use crate::error::EmbedError;

pub const STATUS_NO_EMBED: &str = "Add an Instagram embed blockquote inside #instagram-feed.";
pub const STATUS_REFRESHING: &str = "Refreshing Instagram embed…";
pub const STATUS_UPDATED: &str = "Instagram embed updated.";
pub const STATUS_NO_PROCESSOR: &str = "Instagram embed script loaded without a processor.";
pub const STATUS_FAILED: &str = "Unable to load the Instagram embed script.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedConfig {
    pub script_id: String,
    pub script_url: String,
    /// Blockquotes inside the feed that the embed library renders.
    pub embed_selector: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            script_id: "instagram-embed-script".into(),
            script_url: "https://www.instagram.com/embed.js".into(),
            embed_selector: ".instagram-media".into(),
        }
    }
}

/// The page operations the loader needs.
pub trait ScriptHost {
    /// Whether the feed container holds anything matching `selector`.
    fn has_embeds(&self, selector: &str) -> bool;

    /// Whether the embed library's processor is already callable.
    fn embeds_ready(&self) -> bool;

    fn script_present(&self, id: &str) -> bool;

    /// Append a script element; its load or error event must later reach
    /// [`EmbedLoader::script_loaded`] or [`EmbedLoader::script_failed`].
    fn inject_script(&mut self, id: &str, src: &str) -> Result<(), EmbedError>;

    /// Route the load or error event of a script that is already on the
    /// page to the loader, the same way [`ScriptHost::inject_script`] does.
    fn watch_script(&mut self, id: &str) -> Result<(), EmbedError>;

    fn remove_script(&mut self, id: &str);

    /// Ask the embed library to render blockquotes in the feed container.
    fn process_embeds(&mut self) -> Result<(), EmbedError>;

    fn set_status(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLoad {
    Idle,
    /// Script on the page, load event not seen yet.
    Pending,
    Ready,
}

/// Loads the embed script at most once per page and refreshes the feed.
///
/// The load state lives here instead of in a page-wide global, so each
/// loader can be driven in isolation.
pub struct EmbedLoader<H: ScriptHost> {
    host: H,
    config: EmbedConfig,
    load: ScriptLoad,
}

impl<H: ScriptHost> EmbedLoader<H> {
    pub fn new(host: H, config: EmbedConfig) -> Self {
        Self {
            host,
            config,
            load: ScriptLoad::Idle,
        }
    }

    pub fn state(&self) -> ScriptLoad {
        self.load
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Initial load and the refresh button both land here.
    pub fn refresh(&mut self) {
        if !self.host.has_embeds(&self.config.embed_selector) {
            // Nothing to render, so the script is not worth fetching.
            self.host.set_status(STATUS_NO_EMBED);
            return;
        }

        self.host.set_status(STATUS_REFRESHING);

        if self.host.embeds_ready() {
            self.load = ScriptLoad::Ready;
            self.process();
            return;
        }

        match self.load {
            ScriptLoad::Ready => self.process(),
            ScriptLoad::Pending => {}
            ScriptLoad::Idle => self.load_script(),
        }
    }

    pub fn script_loaded(&mut self) {
        if self.load == ScriptLoad::Ready {
            return;
        }

        tracing::debug!(url = %self.config.script_url, "embed script loaded");
        self.load = ScriptLoad::Ready;
        self.process();
    }

    /// Back to idle so the next refresh injects a fresh script.
    pub fn script_failed(&mut self, reason: impl Into<String>) {
        self.fail(EmbedError::Load(reason.into()));
    }

    fn load_script(&mut self) {
        let id = &self.config.script_id;
        let started = if self.host.script_present(id) {
            tracing::debug!(id = %id, "embed script already on the page, watching it");
            self.host.watch_script(id)
        } else {
            self.host.inject_script(id, &self.config.script_url)
        };

        match started {
            Ok(()) => self.load = ScriptLoad::Pending,
            Err(err) => self.fail(err),
        }
    }

    fn process(&mut self) {
        if !self.host.embeds_ready() {
            tracing::warn!(url = %self.config.script_url, "embed script has no processor");
            self.host.set_status(STATUS_NO_PROCESSOR);
            return;
        }

        match self.host.process_embeds() {
            Ok(()) => self.host.set_status(STATUS_UPDATED),
            Err(err) => {
                tracing::warn!(error = %err, "embed processing failed");
                self.host.set_status(STATUS_FAILED);
            }
        }
    }

    fn fail(&mut self, err: EmbedError) {
        tracing::warn!(error = %err, url = %self.config.script_url, "embed script unavailable");
        self.host.remove_script(&self.config.script_id);
        self.load = ScriptLoad::Idle;
        self.host.set_status(STATUS_FAILED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeHost {
        no_embeds: bool,
        /// `instgrm.Embeds.process` is defined.
        library: bool,
        scripts: Vec<String>,
        watched: Vec<String>,
        injected: usize,
        processed: usize,
        statuses: Vec<String>,
        refuse_inject: bool,
        refuse_watch: bool,
        refuse_process: bool,
    }

    impl ScriptHost for FakeHost {
        fn has_embeds(&self, selector: &str) -> bool {
            assert_eq!(selector, ".instagram-media");
            !self.no_embeds
        }

        fn embeds_ready(&self) -> bool {
            self.library
        }

        fn script_present(&self, id: &str) -> bool {
            self.scripts.iter().any(|s| s == id)
        }

        fn inject_script(&mut self, id: &str, _src: &str) -> Result<(), EmbedError> {
            if self.refuse_inject {
                return Err(EmbedError::Inject("no document".into()));
            }
            self.scripts.push(id.to_string());
            self.injected += 1;
            Ok(())
        }

        fn watch_script(&mut self, id: &str) -> Result<(), EmbedError> {
            if self.refuse_watch {
                return Err(EmbedError::Inject("listener rejected".into()));
            }
            self.watched.push(id.to_string());
            Ok(())
        }

        fn remove_script(&mut self, id: &str) {
            self.scripts.retain(|s| s != id);
        }

        fn process_embeds(&mut self) -> Result<(), EmbedError> {
            if self.refuse_process {
                return Err(EmbedError::Process("process threw".into()));
            }
            self.processed += 1;
            Ok(())
        }

        fn set_status(&mut self, text: &str) {
            self.statuses.push(text.to_string());
        }
    }

    fn loader() -> EmbedLoader<FakeHost> {
        loader_with(FakeHost::default())
    }

    fn loader_with(host: FakeHost) -> EmbedLoader<FakeHost> {
        EmbedLoader::new(host, EmbedConfig::default())
    }

    /// The script finished loading and defined the library.
    fn deliver(l: &mut EmbedLoader<FakeHost>) {
        l.host_mut().library = true;
        l.script_loaded();
    }

    fn last_status(l: &EmbedLoader<FakeHost>) -> &str {
        l.host().statuses.last().map(String::as_str).unwrap_or("")
    }

    #[test]
    fn first_refresh_injects_once() {
        let mut l = loader();

        l.refresh();
        l.refresh();

        assert_eq!(l.state(), ScriptLoad::Pending);
        assert_eq!(l.host().injected, 1);
        assert_eq!(last_status(&l), "Refreshing Instagram embed…");
    }

    #[test]
    fn load_event_processes_feed() {
        let mut l = loader();
        l.refresh();
        deliver(&mut l);

        assert_eq!(l.state(), ScriptLoad::Ready);
        assert_eq!(l.host().processed, 1);
        assert_eq!(last_status(&l), "Instagram embed updated.");

        l.refresh();
        assert_eq!(l.host().processed, 2);
        assert_eq!(l.host().injected, 1);
    }

    #[test]
    fn empty_feed_skips_loading() {
        let mut l = loader_with(FakeHost {
            no_embeds: true,
            ..FakeHost::default()
        });

        l.refresh();

        assert_eq!(l.state(), ScriptLoad::Idle);
        assert_eq!(l.host().injected, 0);
        assert_eq!(l.host().statuses, [STATUS_NO_EMBED]);
        assert_eq!(
            last_status(&l),
            "Add an Instagram embed blockquote inside #instagram-feed."
        );
    }

    #[test]
    fn library_already_on_page_processes_immediately() {
        let mut l = loader_with(FakeHost {
            library: true,
            ..FakeHost::default()
        });

        l.refresh();

        assert_eq!(l.state(), ScriptLoad::Ready);
        assert_eq!(l.host().injected, 0);
        assert!(l.host().watched.is_empty());
        assert_eq!(l.host().processed, 1);
        assert_eq!(last_status(&l), STATUS_UPDATED);
    }

    #[test]
    fn existing_script_is_watched_not_injected() {
        let mut l = loader_with(FakeHost {
            scripts: vec!["instagram-embed-script".into()],
            ..FakeHost::default()
        });

        l.refresh();

        assert_eq!(l.host().injected, 0);
        assert_eq!(l.host().watched, ["instagram-embed-script"]);
        assert_eq!(l.state(), ScriptLoad::Pending);

        deliver(&mut l);
        assert_eq!(l.host().processed, 1);
        assert_eq!(last_status(&l), STATUS_UPDATED);
    }

    #[test]
    fn watch_error_resets_for_retry() {
        let mut l = loader_with(FakeHost {
            scripts: vec!["instagram-embed-script".into()],
            refuse_watch: true,
            ..FakeHost::default()
        });

        l.refresh();
        assert_eq!(l.state(), ScriptLoad::Idle);
        assert_eq!(last_status(&l), STATUS_FAILED);

        // The stale element is gone, so the retry fetches a fresh copy.
        l.refresh();
        assert_eq!(l.host().injected, 1);
        assert_eq!(l.state(), ScriptLoad::Pending);
    }

    #[test]
    fn loaded_without_processor_says_so() {
        let mut l = loader();
        l.refresh();
        l.script_loaded();

        assert_eq!(l.state(), ScriptLoad::Ready);
        assert_eq!(l.host().processed, 0);
        assert_eq!(
            last_status(&l),
            "Instagram embed script loaded without a processor."
        );
    }

    #[test]
    fn failure_resets_for_retry() {
        let mut l = loader();
        l.refresh();
        l.script_failed("network error");

        assert_eq!(l.state(), ScriptLoad::Idle);
        assert!(l.host().scripts.is_empty());
        assert_eq!(last_status(&l), "Unable to load the Instagram embed script.");

        l.refresh();
        assert_eq!(l.host().injected, 2);
        assert_eq!(l.state(), ScriptLoad::Pending);
    }

    #[test]
    fn inject_error_is_reported_not_raised() {
        let mut l = loader_with(FakeHost {
            refuse_inject: true,
            ..FakeHost::default()
        });

        l.refresh();

        assert_eq!(l.state(), ScriptLoad::Idle);
        assert_eq!(last_status(&l), STATUS_FAILED);
    }

    #[test]
    fn processing_error_keeps_script() {
        let mut l = loader_with(FakeHost {
            refuse_process: true,
            ..FakeHost::default()
        });

        l.refresh();
        deliver(&mut l);

        assert_eq!(l.state(), ScriptLoad::Ready);
        assert_eq!(last_status(&l), STATUS_FAILED);
        assert_eq!(l.host().scripts.len(), 1);
    }

    #[test]
    fn loaders_do_not_share_state() {
        let mut a = loader();
        let b = loader();

        a.refresh();
        deliver(&mut a);

        assert_eq!(a.state(), ScriptLoad::Ready);
        assert_eq!(b.state(), ScriptLoad::Idle);
    }
}
