//! Trigger matching for inbound messages.

use tracing::{error, instrument};

use crate::{
    base::{
        error::EngineError,
        types::{Author, OutgoingEvent},
    },
    store::{
        activity::{ActivityEvent, ActivityLog},
        responses::{ResponseStore, render_template},
    },
};

/// Turns message text into at most one reply.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct MatchEngine {
    responses: ResponseStore,
    activity: ActivityLog,
}

impl MatchEngine {
    pub fn new(responses: ResponseStore, activity: ActivityLog) -> Self {
        Self { responses, activity }
    }

    /// Matches `text` against the live trigger table.
    ///
    /// The first trigger in table order that occurs in `text` wins. A match is recorded in
    /// the activity log before the reply is returned; if that write fails, no reply is produced.
    #[instrument(skip_all, fields(author = %author.id))]
    pub fn handle(&self, text: &str, author: &Author, is_permitted_channel: bool) -> Result<Option<OutgoingEvent>, EngineError> {
        if !is_permitted_channel || text.is_empty() {
            return Ok(None);
        }

        let selection = match self.responses.select(text) {
            Ok(Some(selection)) => selection,
            Ok(None) => return Ok(None),
            Err(err) => {
                error!("Response draw failed: {}", err);
                let _ = self.activity.error(format!("Response draw failed: {err}"));
                return Err(err);
            }
        };

        let identity = author.to_string();
        self.activity.info(ActivityEvent::Match {
            trigger: &selection.trigger,
            by: &identity,
        })?;

        Ok(Some(OutgoingEvent {
            text: render_template(&selection.template, &author.display_name),
            trigger: selection.trigger,
        }))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        engine::analytics::aggregate,
        store::{activity::ActivityRecord, responses::TriggerTable},
    };

    fn engine(table: TriggerTable) -> (tempfile::TempDir, MatchEngine, ActivityLog) {
        let dir = tempfile::tempdir().unwrap();
        let activity = ActivityLog::open(dir.path().join("bot_activity.log")).unwrap();
        let responses = ResponseStore::with_rng(StdRng::seed_from_u64(5));
        responses.replace(table);

        (dir, MatchEngine::new(responses, activity.clone()), activity)
    }

    #[test]
    fn substitutes_the_display_name() {
        let (_dir, engine, _) = engine(TriggerTable::from_pairs([("hello", vec!["hi [userName]", "yo [userName]"])]));
        let ann = Author::new("U1", "Ann");

        let first = engine.handle("hello bot", &ann, true).unwrap().unwrap();
        let second = engine.handle("hello bot", &ann, true).unwrap().unwrap();
        let third = engine.handle("hello bot", &ann, true).unwrap().unwrap();

        let mut seen = vec![first.text.clone(), second.text.clone()];
        seen.sort();
        assert_eq!(seen, vec!["hi Ann".to_string(), "yo Ann".to_string()]);
        assert_ne!(third.text, second.text);
        assert_eq!(first.trigger, "hello");
    }

    #[test]
    fn first_trigger_in_table_order_wins() {
        let (_dir, engine, activity) = engine(TriggerTable::from_pairs([("ne", vec!["short"]), ("neta", vec!["long"])]));

        let event = engine.handle("some neta", &Author::new("U1", "Ann"), true).unwrap().unwrap();
        assert_eq!(event.trigger, "ne");
        assert_eq!(event.text, "short");
        assert_eq!(activity.read_lines().unwrap().len(), 1);
    }

    #[test]
    fn records_exactly_one_match_entry() {
        let (_dir, engine, activity) = engine(TriggerTable::from_pairs([("hello", vec!["hi"])]));

        engine.handle("hello", &Author::new("U1", "Ann"), true).unwrap();

        let lines = activity.read_lines().unwrap();
        assert_eq!(lines.len(), 1);
        let record = ActivityRecord::parse(&lines[0]).unwrap();
        assert_eq!(record.event(), Some(ActivityEvent::Match { trigger: "hello", by: "Ann (U1)" }));
    }

    #[test]
    fn ignores_unpermitted_channels_and_empty_text() {
        let (_dir, engine, activity) = engine(TriggerTable::from_pairs([("hello", vec!["hi"])]));
        let ann = Author::new("U1", "Ann");

        assert!(engine.handle("hello", &ann, false).unwrap().is_none());
        assert!(engine.handle("", &ann, true).unwrap().is_none());
        assert!(engine.handle("nothing here", &ann, true).unwrap().is_none());
        assert!(activity.read_lines().unwrap().is_empty());
    }

    #[test]
    fn display_names_cannot_redirect_match_counts() {
        let (_dir, engine, activity) = engine(TriggerTable::from_pairs([("hello", vec!["hi"])]));

        engine.handle("hello", &Author::new("U1", "Bob' by Mallory"), true).unwrap();

        let lines = activity.read_lines().unwrap();
        let record = ActivityRecord::parse(&lines[0]).unwrap();
        assert_eq!(record.event(), Some(ActivityEvent::Match { trigger: "hello", by: "Bob' by Mallory (U1)" }));

        let stats = aggregate(lines.iter().map(String::as_str), record.date, record.date);
        assert_eq!(stats.ranked_triggers(), vec![("hello", 1)]);
    }
}
