use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use crate::character::{Character, CharacterStore};
use crate::events::EventPublisher;
use crate::mapfile::{self, LoadedMap};
use crate::mobs::{self, MobRuntime};
use crate::protocol::ServerMessage;
use crate::session::{Session, SessionId};
use crate::state::{MobState, Npc, PlayerState, WorldSnapshot, ZoneState};
use crate::tile::TileMap;

pub const PLAYER_MOVE_SPEED: f64 = 0.35;
pub const PLAYER_COLLISION_RADIUS: f64 = 0.2;
pub const PLAYER_ATTACK_RANGE: f64 = 1.3;
pub const BASE_PLAYER_DAMAGE: i32 = 20;
pub const MOB_AGGRO_RANGE: f64 = 6.0;
pub const MOB_ATTACK_RANGE: f64 = 1.1;
pub const MOB_MOVE_SPEED: f64 = 0.18;
pub const MOB_COLLISION_RADIUS: f64 = 0.2;
pub const MOB_ATTACK_COOLDOWN_TICKS: u32 = 7;
pub const MOB_RESPAWN_TICKS: u32 = 50;
pub const MOB_WANDER_MAX_TICKS: i32 = 20;

const XP_PER_MOB_KILL: i32 = 25;
const PERSIST_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (ax - bx).hypot(ay - by)
}

#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub zone_id: String,
    pub tick_rate: u32,
    pub map_file: Option<PathBuf>,
}

/// All mutable zone state. Guarded by a single reader/writer lock in
/// `WorldService`; every mutation happens under the write half.
pub(crate) struct Zone {
    pub(crate) tick: u64,
    pub(crate) zone_id: String,
    pub(crate) map: TileMap,
    pub(crate) npcs: Vec<Npc>,
    pub(crate) mobs: BTreeMap<String, MobRuntime>,
    pub(crate) players: BTreeMap<Uuid, PlayerState>,
    pub(crate) sessions: BTreeMap<SessionId, Session>,
    pub(crate) rng: StdRng,
    next_session_id: u64,
}

impl Zone {
    pub(crate) fn new(loaded: LoadedMap, zone_id: &str) -> Self {
        let mobs = loaded
            .mobs
            .into_iter()
            .map(|state| (state.id.clone(), MobRuntime::new(state)))
            .collect();
        Self {
            tick: 0,
            zone_id: zone_id.to_string(),
            map: loaded.map,
            npcs: loaded.npcs,
            mobs,
            players: BTreeMap::new(),
            sessions: BTreeMap::new(),
            rng: StdRng::from_entropy(),
            next_session_id: 0,
        }
    }

    fn players_in_zone(&self, zone_id: &str) -> Vec<PlayerState> {
        self.players
            .values()
            .filter(|p| p.zone_id == zone_id)
            .cloned()
            .collect()
    }

    fn mob_states(&self, zone_id: &str) -> Vec<MobState> {
        self.mobs
            .values()
            .filter(|m| m.state.zone_id == zone_id)
            .map(|m| m.state.clone())
            .collect()
    }
}

enum AttackOutcome {
    Refused(&'static str),
    Hit {
        attacker: Uuid,
        zone_id: String,
        damage: i32,
        /// Attacker snapshot after experience was granted, set on a kill.
        killed: Option<PlayerState>,
    },
}

/// The authoritative zone simulation. Command handlers and the tick loop
/// mutate state under the write lock and broadcast after releasing it; the
/// broadcaster and read-only endpoints take the read lock.
pub struct WorldService {
    zone_id: String,
    tick_rate: u32,
    inner: RwLock<Zone>,
    updater: Option<Arc<dyn CharacterStore>>,
    publisher: Arc<dyn EventPublisher>,
}

impl WorldService {
    /// Build a world from the configured map file, falling back to the
    /// built-in map on any load failure.
    pub fn new(
        config: WorldConfig,
        updater: Option<Arc<dyn CharacterStore>>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Arc<Self> {
        let loaded = match &config.map_file {
            Some(path) => match mapfile::load_map(path, &config.zone_id) {
                Ok(loaded) => loaded,
                Err(err) => {
                    tracing::warn!(
                        map_file = %path.display(),
                        error = %err,
                        "failed to load world map, using fallback"
                    );
                    mapfile::fallback_world(&config.zone_id)
                }
            },
            None => mapfile::fallback_world(&config.zone_id),
        };
        Self::with_map(loaded, &config.zone_id, config.tick_rate, updater, publisher)
    }

    pub fn with_map(
        loaded: LoadedMap,
        zone_id: &str,
        tick_rate: u32,
        updater: Option<Arc<dyn CharacterStore>>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            zone_id: zone_id.to_string(),
            tick_rate,
            inner: RwLock::new(Zone::new(loaded, zone_id)),
            updater,
            publisher,
        })
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Record a new connection. The returned receiver is the session's
    /// outbound queue, drained by the connection's writer task.
    pub async fn register(&self, account_id: Uuid) -> (SessionId, mpsc::Receiver<String>) {
        let mut zone = self.inner.write().await;
        zone.next_session_id += 1;
        let id = SessionId(zone.next_session_id);
        let (session, rx) = Session::new(id, account_id);
        zone.sessions.insert(id, session);
        tracing::debug!(session = %id, account = %account_id, "session registered");
        (id, rx)
    }

    /// Remove a session and its player, notify the zone, and attempt one
    /// best-effort position write. Dropping the session closes its
    /// outbound queue, which ends the writer pump.
    pub async fn unregister(&self, session_id: SessionId) {
        let (account_id, removed) = {
            let mut zone = self.inner.write().await;
            let Some(session) = zone.sessions.remove(&session_id) else {
                return;
            };
            let player = session
                .character_id
                .and_then(|cid| zone.players.remove(&cid));
            (session.account_id, player)
        };
        tracing::debug!(session = %session_id, "session unregistered");

        let Some(player) = removed else { return };
        self.broadcast_zone(
            Some(player.id),
            &player.zone_id,
            &ServerMessage::PlayerLeft {
                player_id: player.id,
            },
        )
        .await;
        self.broadcast_zone(
            None,
            &player.zone_id,
            &ServerMessage::Broadcast {
                message: format!("{} left the world", player.name),
            },
        )
        .await;
        self.publish_event(
            "world.player_left",
            serde_json::json!({ "character_id": player.id }),
        );

        if let Some(updater) = &self.updater {
            let write = updater.update_position(
                account_id,
                player.id,
                player.x,
                player.y,
                &player.zone_id,
            );
            match tokio::time::timeout(PERSIST_TIMEOUT, write).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(character = %player.id, error = %err, "failed to persist position")
                }
                Err(_) => {
                    tracing::warn!(character = %player.id, "position persistence timed out")
                }
            }
        }
    }

    /// Attach a character to a session and drop it into the world. A
    /// repeat join replaces the session's previous player runtime.
    pub async fn join(&self, session_id: SessionId, character: Character) {
        let (player, welcome) = {
            let mut zone = self.inner.write().await;
            if !zone.sessions.contains_key(&session_id) {
                return;
            }

            // Persisted position, unless it is the never-placed sentinel or
            // has gone stale against the current map.
            let (mut x, mut y) = (character.pos_x, character.pos_y);
            if (x, y) == (0.0, 0.0) || !zone.map.walkable(x, y) {
                x = zone.map.spawn.x;
                y = zone.map.spawn.y;
            }
            if !zone.map.walkable(x, y) {
                x = 1.5;
                y = 1.5;
            }

            let player = PlayerState {
                id: character.id,
                name: character.name.clone(),
                x,
                y,
                hp: 100,
                max_hp: 100,
                class: character.class.clone(),
                level: 1,
                experience: 0,
                gold: 0,
                zone_id: self.zone_id.clone(),
            };

            let previous = match zone.sessions.get_mut(&session_id) {
                Some(session) => session.character_id.replace(character.id),
                None => return,
            };
            if let Some(old_id) = previous {
                if old_id != character.id {
                    zone.players.remove(&old_id);
                }
            }
            zone.players.insert(character.id, player.clone());

            let welcome = ServerMessage::Welcome {
                self_id: player.id,
                character: player.clone(),
                zone_id: self.zone_id.clone(),
                world: ZoneState {
                    zone_id: self.zone_id.clone(),
                    map: zone.map.clone(),
                    players: zone.players_in_zone(&self.zone_id),
                    mobs: zone.mob_states(&self.zone_id),
                    npcs: zone.npcs.clone(),
                },
            };
            (player, welcome)
        };

        self.send_to(session_id, &welcome).await;
        self.broadcast_zone(
            Some(player.id),
            &self.zone_id,
            &ServerMessage::PlayerJoined {
                player: player.clone(),
            },
        )
        .await;
        self.broadcast_zone(
            None,
            &self.zone_id,
            &ServerMessage::Broadcast {
                message: format!("{} joined the world", player.name),
            },
        )
        .await;
        self.publish_event(
            "world.player_joined",
            serde_json::json!({ "character_id": player.id, "zone_id": player.zone_id }),
        );
    }

    /// Apply a movement intent. The step is resolved axis by axis so a
    /// player blocked on one axis still slides along the other.
    pub async fn move_player(&self, session_id: SessionId, dx: f64, dy: f64) {
        if dx.abs() < 1e-6 && dy.abs() < 1e-6 {
            return;
        }
        let norm = dx.hypot(dy);
        let (dx, dy) = if norm > 1.0 { (dx / norm, dy / norm) } else { (dx, dy) };
        let step_x = dx * PLAYER_MOVE_SPEED;
        let step_y = dy * PLAYER_MOVE_SPEED;

        let (account_id, character_id, x, y, zone_id) = {
            let mut zone = self.inner.write().await;
            let zone = &mut *zone;
            let Some(session) = zone.sessions.get(&session_id) else {
                return;
            };
            let account_id = session.account_id;
            let Some(character_id) = session.character_id else {
                return;
            };
            let Some(player) = zone.players.get_mut(&character_id) else {
                return;
            };

            let next_x = player.x + step_x;
            if zone
                .map
                .walkable_radius(next_x, player.y, PLAYER_COLLISION_RADIUS)
            {
                player.x = next_x;
            }
            let next_y = player.y + step_y;
            if zone
                .map
                .walkable_radius(player.x, next_y, PLAYER_COLLISION_RADIUS)
            {
                player.y = next_y;
            }
            (
                account_id,
                character_id,
                player.x,
                player.y,
                player.zone_id.clone(),
            )
        };

        self.broadcast_zone(
            None,
            &zone_id,
            &ServerMessage::PlayerMoved {
                player_id: character_id,
                x,
                y,
            },
        )
        .await;

        if let Some(updater) = self.updater.clone() {
            tokio::spawn(async move {
                let write = updater.update_position(account_id, character_id, x, y, &zone_id);
                match tokio::time::timeout(PERSIST_TIMEOUT, write).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(character = %character_id, error = %err, "position save failed")
                    }
                    Err(_) => {
                        tracing::warn!(character = %character_id, "position save timed out")
                    }
                }
            });
        }
    }

    /// Resolve a player attack against a mob.
    pub async fn attack(&self, session_id: SessionId, target_id: &str) {
        let outcome = {
            let mut zone = self.inner.write().await;
            let zone = &mut *zone;
            let Some(session) = zone.sessions.get(&session_id) else {
                return;
            };
            let Some(character_id) = session.character_id else {
                return;
            };
            let Some(player) = zone.players.get(&character_id) else {
                return;
            };
            let (px, py, level) = (player.x, player.y, player.level);

            match zone.mobs.get_mut(target_id) {
                Some(mob) if mob.state.alive => {
                    if distance(px, py, mob.state.x, mob.state.y) > PLAYER_ATTACK_RANGE {
                        AttackOutcome::Refused("target out of range")
                    } else {
                        let damage = BASE_PLAYER_DAMAGE + (level - 1) * 3;
                        mob.state.hp -= damage;
                        let killed = if mob.state.hp <= 0 {
                            mob.kill();
                            zone.players.get_mut(&character_id).map(|player| {
                                player.grant_experience(XP_PER_MOB_KILL);
                                player.clone()
                            })
                        } else {
                            None
                        };
                        AttackOutcome::Hit {
                            attacker: character_id,
                            zone_id: self.zone_id.clone(),
                            damage,
                            killed,
                        }
                    }
                }
                _ => AttackOutcome::Refused("invalid mob target"),
            }
        };

        match outcome {
            AttackOutcome::Refused(reason) => self.send_error(session_id, reason).await,
            AttackOutcome::Hit {
                attacker,
                zone_id,
                damage,
                killed,
            } => {
                self.broadcast_zone(
                    None,
                    &zone_id,
                    &ServerMessage::Combat {
                        attacker: attacker.to_string(),
                        target: target_id.to_string(),
                        damage,
                    },
                )
                .await;

                if let Some(player) = killed {
                    self.broadcast_zone(
                        None,
                        &zone_id,
                        &ServerMessage::MobDied {
                            mob_id: target_id.to_string(),
                        },
                    )
                    .await;
                    self.broadcast_zone(
                        None,
                        &zone_id,
                        &ServerMessage::Broadcast {
                            message: format!("{} defeated {}", player.name, target_id),
                        },
                    )
                    .await;
                    self.send_to(session_id, &ServerMessage::PlayerUpdate { player })
                        .await;
                    self.publish_event(
                        "world.mob_died",
                        serde_json::json!({ "mob_id": target_id, "zone_id": zone_id }),
                    );
                }
            }
        }
    }

    /// One simulation tick: advance mobs under the write lock, then fan the
    /// collected events out followed by the full mob list.
    pub async fn step(&self) {
        let started = Instant::now();
        let (events, mobs, player_count, mob_count, tick) = {
            let mut zone = self.inner.write().await;
            zone.tick += 1;
            let zone = &mut *zone;
            let events = mobs::step_mobs(zone);
            let mob_list = zone.mob_states(&self.zone_id);
            (
                events,
                mob_list,
                zone.players.len(),
                zone.mobs.len(),
                zone.tick,
            )
        };

        let event_count = events.len();
        for event in events {
            self.broadcast_zone(None, &event.zone_id, &event.message).await;
        }
        self.broadcast_zone(None, &self.zone_id, &ServerMessage::MobUpdate { mobs })
            .await;

        observability::TickMetrics {
            tick,
            duration_us: started.elapsed().as_micros(),
            event_count,
            player_count,
            mob_count,
        }
        .log(self.tick_budget().as_micros());
    }

    /// Drive the tick loop until the shutdown signal fires, then drop every
    /// session so their writer pumps close the connections.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.tick_budget());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(zone = %self.zone_id, tick_rate = self.tick_rate, "world tick loop running");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.step().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.close_all_sessions().await;
    }

    fn tick_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    async fn close_all_sessions(&self) {
        let mut zone = self.inner.write().await;
        let dropped = zone.sessions.len();
        zone.sessions.clear();
        zone.players.clear();
        tracing::info!(sessions = dropped, "world stopped, sessions dropped");
    }

    /// Serialize once, then enqueue on every session whose player is in the
    /// zone. Sessions that joined nothing are skipped; full queues drop the
    /// frame for that recipient only.
    async fn broadcast_zone(&self, skip: Option<Uuid>, zone_id: &str, message: &ServerMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize frame");
                return;
            }
        };

        let targets: Vec<(SessionId, mpsc::Sender<String>)> = {
            let zone = self.inner.read().await;
            zone.sessions
                .values()
                .filter_map(|session| {
                    let character_id = session.character_id?;
                    if skip == Some(character_id) {
                        return None;
                    }
                    let player = zone.players.get(&character_id)?;
                    if player.zone_id != zone_id {
                        return None;
                    }
                    Some((session.id, session.sender()))
                })
                .collect()
        };

        for (session_id, tx) in targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(session = %session_id, "outbound queue full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Deliver a frame to one session, without blocking.
    pub async fn send_to(&self, session_id: SessionId, message: &ServerMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize frame");
                return;
            }
        };
        let tx = {
            let zone = self.inner.read().await;
            zone.sessions.get(&session_id).map(|s| s.sender())
        };
        if let Some(tx) = tx {
            if tx.try_send(frame).is_err() {
                tracing::debug!(session = %session_id, "direct frame dropped");
            }
        }
    }

    pub async fn send_error(&self, session_id: SessionId, message: &str) {
        self.send_to(
            session_id,
            &ServerMessage::Error {
                message: message.to_string(),
            },
        )
        .await;
    }

    /// Read-only snapshot for the HTTP surface.
    pub async fn snapshot(&self) -> WorldSnapshot {
        let zone = self.inner.read().await;
        WorldSnapshot {
            tick: zone.tick,
            zone_id: zone.zone_id.clone(),
            map: zone.map.clone(),
            players: zone.players.values().cloned().collect(),
            npcs: zone.npcs.clone(),
            mobs: zone.mobs.values().map(|m| m.state.clone()).collect(),
        }
    }

    pub async fn online_players(&self) -> Vec<PlayerState> {
        let zone = self.inner.read().await;
        zone.players.values().cloned().collect()
    }

    fn publish_event(&self, subject: &str, payload: serde_json::Value) {
        match serde_json::to_vec(&payload) {
            Ok(bytes) => self.publisher.publish(subject, &bytes),
            Err(err) => tracing::debug!(subject, error = %err, "event payload serialization failed"),
        }
    }
}
