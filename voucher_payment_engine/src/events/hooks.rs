use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, LedgerSettledEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub ledger_settled_producer: Vec<EventProducer<LedgerSettledEvent>>,
}

pub struct EventHandlers {
    pub on_ledger_settled: Option<EventHandler<LedgerSettledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_ledger_settled = hooks.on_ledger_settled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_ledger_settled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_ledger_settled {
            result.ledger_settled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_ledger_settled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_ledger_settled: Option<Handler<LedgerSettledEvent>>,
}

impl EventHooks {
    pub fn on_ledger_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(LedgerSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_ledger_settled = Some(Arc::new(f));
        self
    }
}
