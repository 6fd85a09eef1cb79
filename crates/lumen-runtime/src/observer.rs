use crossbeam_channel::{Receiver, Sender, unbounded};
use lumen_world::ChunkCoord;

/// Receives light change notifications. The engine runs fine with none
/// registered.
pub trait LightObserver: Send + Sync {
    /// The chunk's published light changed and its render texture is stale.
    fn chunk_stale(&self, coord: ChunkCoord, prioritized: bool);

    /// Per-cell notifications are only produced when this returns true.
    fn wants_cell_events(&self) -> bool {
        false
    }

    fn cell_changed(&self, _coord: ChunkCoord, _lx: usize, _ly: usize) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightEvent {
    ChunkStale {
        coord: ChunkCoord,
        prioritized: bool,
    },
    CellChanged {
        coord: ChunkCoord,
        lx: usize,
        ly: usize,
    },
}

/// Observer that queues events on a channel for a consumer thread to drain.
pub struct ChannelObserver {
    tx: Sender<LightEvent>,
    rx: Receiver<LightEvent>,
    cell_events: bool,
}

impl ChannelObserver {
    pub fn new(cell_events: bool) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            cell_events,
        }
    }

    pub fn receiver(&self) -> Receiver<LightEvent> {
        self.rx.clone()
    }

    pub fn drain_events(&self) -> Vec<LightEvent> {
        self.rx.try_iter().collect()
    }
}

impl LightObserver for ChannelObserver {
    fn chunk_stale(&self, coord: ChunkCoord, prioritized: bool) {
        let _ = self.tx.send(LightEvent::ChunkStale { coord, prioritized });
    }

    fn wants_cell_events(&self) -> bool {
        self.cell_events
    }

    fn cell_changed(&self, coord: ChunkCoord, lx: usize, ly: usize) {
        let _ = self.tx.send(LightEvent::CellChanged { coord, lx, ly });
    }
}
