//! Shared test utilities used across mlbench crates.

pub mod tracing {
    //! Span and event capture for asserting instrumentation in tests.
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    /// Layer that keeps every closed span and emitted event in memory.
    ///
    /// Clones share storage, so a clone can be handed to a subscriber while
    /// the original is kept for assertions.
    #[derive(Clone, Default)]
    pub struct RecordingLayer {
        spans: Arc<Mutex<Vec<SpanRecord>>>,
        events: Arc<Mutex<Vec<EventRecord>>>,
    }

    impl RecordingLayer {
        /// Closed spans in completion order.
        ///
        /// # Examples
        /// ```
        /// use mlbench_test_support::tracing::RecordingLayer;
        ///
        /// assert!(RecordingLayer::default().spans().is_empty());
        /// ```
        #[must_use]
        pub fn spans(&self) -> Vec<SpanRecord> {
            lock(&self.spans).clone()
        }

        /// Events in emission order.
        #[must_use]
        pub fn events(&self) -> Vec<EventRecord> {
            lock(&self.events).clone()
        }

        /// First closed span called `name`.
        #[must_use]
        pub fn span_named(&self, name: &str) -> Option<SpanRecord> {
            lock(&self.spans).iter().find(|span| span.name == name).cloned()
        }

        /// Every closed span called `name`.
        #[must_use]
        pub fn spans_named(&self, name: &str) -> Vec<SpanRecord> {
            lock(&self.spans)
                .iter()
                .filter(|span| span.name == name)
                .cloned()
                .collect()
        }

        /// Events whose `message` field equals `message`.
        #[must_use]
        pub fn events_with_message(&self, message: &str) -> Vec<EventRecord> {
            lock(&self.events)
                .iter()
                .filter(|event| event.message() == Some(message))
                .cloned()
                .collect()
        }
    }

    /// Runs `work` under a fresh registry with a [`RecordingLayer`] and
    /// returns its value together with the layer.
    ///
    /// # Examples
    /// ```
    /// use mlbench_test_support::tracing::capture;
    ///
    /// let ((), layer) = capture(|| {
    ///     let _span = tracing::info_span!("demo.work").entered();
    ///     tracing::info!(items = 3, "working");
    /// });
    /// assert!(layer.span_named("demo.work").is_some());
    /// assert_eq!(layer.events_with_message("working").len(), 1);
    /// ```
    pub fn capture<T>(work: impl FnOnce() -> T) -> (T, RecordingLayer) {
        let layer = RecordingLayer::default();
        let subscriber = tracing_subscriber::registry().with(layer.clone());
        let value = tracing::subscriber::with_default(subscriber, work);
        (value, layer)
    }

    fn lock<T>(records: &Mutex<Vec<T>>) -> MutexGuard<'_, Vec<T>> {
        records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A closed span with its name and recorded fields.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SpanRecord {
        /// Span name from the metadata.
        pub name: String,
        /// Fields recorded on creation or later via `record`.
        pub fields: HashMap<String, String>,
    }

    impl SpanRecord {
        /// Value of `field`, rendered as text.
        #[must_use]
        pub fn field(&self, field: &str) -> Option<&str> {
            self.fields.get(field).map(String::as_str)
        }
    }

    /// An emitted event with its level, target and fields.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EventRecord {
        /// Level of the event.
        pub level: Level,
        /// Target from the metadata.
        pub target: String,
        /// Fields attached to the event, including `message`.
        pub fields: HashMap<String, String>,
    }

    impl EventRecord {
        /// Value of `field`, rendered as text.
        #[must_use]
        pub fn field(&self, field: &str) -> Option<&str> {
            self.fields.get(field).map(String::as_str)
        }

        /// The event message, if any.
        #[must_use]
        pub fn message(&self) -> Option<&str> {
            self.field("message")
        }
    }

    struct OpenSpan(SpanRecord);

    impl<S> Layer<S> for RecordingLayer
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            id: &tracing::span::Id,
            ctx: Context<'_, S>,
        ) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            let mut record = SpanRecord {
                name: attrs.metadata().name().to_owned(),
                fields: HashMap::new(),
            };
            attrs.record(&mut FieldRecorder(&mut record.fields));
            span.extensions_mut().insert(OpenSpan(record));
        }

        fn on_record(
            &self,
            id: &tracing::span::Id,
            values: &tracing::span::Record<'_>,
            ctx: Context<'_, S>,
        ) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            if let Some(OpenSpan(record)) = span.extensions_mut().get_mut::<OpenSpan>() {
                values.record(&mut FieldRecorder(&mut record.fields));
            }
        }

        fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
            let Some(span) = ctx.span(&id) else {
                return;
            };
            if let Some(OpenSpan(record)) = span.extensions_mut().remove::<OpenSpan>() {
                lock(&self.spans).push(record);
            }
        }

        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = HashMap::new();
            event.record(&mut FieldRecorder(&mut fields));
            lock(&self.events).push(EventRecord {
                level: *event.metadata().level(),
                target: event.metadata().target().to_owned(),
                fields,
            });
        }
    }

    struct FieldRecorder<'a>(&'a mut HashMap<String, String>);

    impl FieldRecorder<'_> {
        fn put(&mut self, field: &Field, value: String) {
            self.0.insert(field.name().to_owned(), value);
        }
    }

    impl Visit for FieldRecorder<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.put(field, format!("{value:?}"));
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            self.put(field, value.to_owned());
        }

        fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
            self.put(field, value.to_string());
        }

        fn record_bool(&mut self, field: &Field, value: bool) {
            self.put(field, value.to_string());
        }

        fn record_i64(&mut self, field: &Field, value: i64) {
            self.put(field, value.to_string());
        }

        fn record_u64(&mut self, field: &Field, value: u64) {
            self.put(field, value.to_string());
        }

        fn record_f64(&mut self, field: &Field, value: f64) {
            self.put(field, value.to_string());
        }
    }

    #[cfg(test)]
    mod tests {
        use rstest::rstest;

        use super::capture;

        #[rstest]
        fn records_span_fields_and_late_values() {
            let ((), layer) = capture(|| {
                let span = tracing::info_span!("unit.span", rows = 4_u64, outcome = tracing::field::Empty);
                span.record("outcome", "done");
            });
            let span = layer.span_named("unit.span").expect("span recorded");
            assert_eq!(span.field("rows"), Some("4"));
            assert_eq!(span.field("outcome"), Some("done"));
        }

        #[rstest]
        fn filters_events_by_message() {
            let ((), layer) = capture(|| {
                tracing::warn!(attempt = 1_u64, "retrying");
                tracing::info!("finished");
                tracing::warn!(attempt = 2_u64, "retrying");
            });
            let retries = layer.events_with_message("retrying");
            assert_eq!(retries.len(), 2);
            assert_eq!(retries[1].field("attempt"), Some("2"));
            assert_eq!(layer.events().len(), 3);
        }
    }
}
