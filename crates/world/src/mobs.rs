use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::Rng;
use uuid::Uuid;

use crate::protocol::ServerMessage;
use crate::service::{
    distance, Zone, MOB_AGGRO_RANGE, MOB_ATTACK_COOLDOWN_TICKS, MOB_ATTACK_RANGE,
    MOB_COLLISION_RADIUS, MOB_MOVE_SPEED, MOB_RESPAWN_TICKS, MOB_WANDER_MAX_TICKS,
};
use crate::state::{MobState, PlayerState};
use crate::tile::TileMap;

/// Per-mob simulation state. The wire-visible part lives in `state`; the
/// rest drives the tick AI.
#[derive(Debug)]
pub(crate) struct MobRuntime {
    pub(crate) state: MobState,
    pub(crate) spawn_x: f64,
    pub(crate) spawn_y: f64,
    pub(crate) attack_cooldown: u32,
    pub(crate) respawn_counter: u32,
    pub(crate) wander_dx: f64,
    pub(crate) wander_dy: f64,
    pub(crate) wander_ticks_remain: i32,
}

impl MobRuntime {
    pub(crate) fn new(state: MobState) -> Self {
        Self {
            spawn_x: state.x,
            spawn_y: state.y,
            state,
            attack_cooldown: 0,
            respawn_counter: 0,
            wander_dx: 0.0,
            wander_dy: 0.0,
            wander_ticks_remain: 0,
        }
    }

    fn within_patrol(&self, x: f64, y: f64) -> bool {
        distance(self.spawn_x, self.spawn_y, x, y) <= self.state.patrol_radius
    }

    /// Mark the mob dead and start its respawn countdown.
    pub(crate) fn kill(&mut self) {
        self.state.alive = false;
        self.state.hp = 0;
        self.respawn_counter = MOB_RESPAWN_TICKS;
    }
}

/// An event produced under the write lock, broadcast after it is released.
#[derive(Debug)]
pub(crate) struct ZoneEvent {
    pub(crate) zone_id: String,
    pub(crate) message: ServerMessage,
}

/// Advance every mob by one tick. Iteration follows the ordered mob table,
/// so event order is stable across runs with the same inputs.
pub(crate) fn step_mobs(zone: &mut Zone) -> Vec<ZoneEvent> {
    let mut events = Vec::new();
    let Zone {
        map,
        mobs,
        players,
        rng,
        ..
    } = zone;

    for mob in mobs.values_mut() {
        if !mob.state.alive {
            step_dead(mob, &mut events);
            continue;
        }

        let target = closest_live_player(
            players,
            &mob.state.zone_id,
            mob.state.x,
            mob.state.y,
            MOB_AGGRO_RANGE,
        );
        match target {
            Some(target_id) => {
                let Some(player) = players.get_mut(&target_id) else {
                    continue;
                };
                let d = distance(player.x, player.y, mob.state.x, mob.state.y);
                if d <= MOB_ATTACK_RANGE {
                    if mob.attack_cooldown == 0 {
                        apply_mob_attack(map, mob, player, &mut events);
                        mob.attack_cooldown = MOB_ATTACK_COOLDOWN_TICKS;
                    } else {
                        mob.attack_cooldown -= 1;
                    }
                } else {
                    chase(map, mob, player.x, player.y);
                    if mob.attack_cooldown > 0 {
                        mob.attack_cooldown -= 1;
                    }
                }
            }
            None => {
                if mob.attack_cooldown > 0 {
                    mob.attack_cooldown -= 1;
                }
                wander(map, rng, mob);
            }
        }
    }

    events
}

fn step_dead(mob: &mut MobRuntime, events: &mut Vec<ZoneEvent>) {
    if mob.respawn_counter > 0 {
        mob.respawn_counter -= 1;
    }
    if mob.respawn_counter == 0 {
        mob.state.alive = true;
        mob.state.hp = mob.state.max_hp;
        mob.state.x = mob.spawn_x;
        mob.state.y = mob.spawn_y;
        events.push(ZoneEvent {
            zone_id: mob.state.zone_id.clone(),
            message: ServerMessage::Broadcast {
                message: format!("{} has respawned", mob.state.name),
            },
        });
    }
}

fn closest_live_player(
    players: &BTreeMap<Uuid, PlayerState>,
    zone_id: &str,
    x: f64,
    y: f64,
    range: f64,
) -> Option<Uuid> {
    let mut best: Option<(Uuid, f64)> = None;
    for (id, player) in players {
        if player.zone_id != zone_id || player.hp <= 0 {
            continue;
        }
        let d = distance(x, y, player.x, player.y);
        if d <= range && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((*id, d));
        }
    }
    best.map(|(id, _)| id)
}

/// Straight-line approach; the step only commits if it stays on walkable
/// ground inside the patrol circle.
fn chase(map: &TileMap, mob: &mut MobRuntime, tx: f64, ty: f64) {
    let dx = tx - mob.state.x;
    let dy = ty - mob.state.y;
    let n = dx.hypot(dy);
    if n < 1e-6 {
        return;
    }
    let nx = mob.state.x + dx / n * MOB_MOVE_SPEED;
    let ny = mob.state.y + dy / n * MOB_MOVE_SPEED;
    if mob.within_patrol(nx, ny) && map.walkable_radius(nx, ny, MOB_COLLISION_RADIUS) {
        mob.state.x = nx;
        mob.state.y = ny;
    }
}

fn wander(map: &TileMap, rng: &mut StdRng, mob: &mut MobRuntime) {
    if mob.wander_ticks_remain <= 0 {
        let angle = rng.gen::<f64>() * std::f64::consts::TAU;
        mob.wander_dx = angle.cos() * MOB_MOVE_SPEED * 0.7;
        mob.wander_dy = angle.sin() * MOB_MOVE_SPEED * 0.7;
        mob.wander_ticks_remain = 5 + rng.gen_range(0..MOB_WANDER_MAX_TICKS);
    }
    mob.wander_ticks_remain -= 1;
    let nx = mob.state.x + mob.wander_dx;
    let ny = mob.state.y + mob.wander_dy;
    if !mob.within_patrol(nx, ny) || !map.walkable_radius(nx, ny, MOB_COLLISION_RADIUS) {
        // Heading leads out of bounds; reroll next tick without moving.
        mob.wander_ticks_remain = 0;
        return;
    }
    mob.state.x = nx;
    mob.state.y = ny;
}

fn apply_mob_attack(
    map: &TileMap,
    mob: &mut MobRuntime,
    player: &mut PlayerState,
    events: &mut Vec<ZoneEvent>,
) {
    events.push(ZoneEvent {
        zone_id: player.zone_id.clone(),
        message: ServerMessage::Combat {
            attacker: mob.state.id.clone(),
            target: player.id.to_string(),
            damage: mob.state.damage,
        },
    });
    player.hp -= mob.state.damage;
    if player.hp > 0 {
        return;
    }

    // No death penalty: full heal and teleport back to the spawn point.
    player.hp = player.max_hp;
    player.x = map.spawn.x;
    player.y = map.spawn.y;
    events.push(ZoneEvent {
        zone_id: player.zone_id.clone(),
        message: ServerMessage::PlayerDied {
            player_id: player.id,
        },
    });
    events.push(ZoneEvent {
        zone_id: player.zone_id.clone(),
        message: ServerMessage::PlayerMoved {
            player_id: player.id,
            x: player.x,
            y: player.y,
        },
    });
}
