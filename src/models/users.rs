use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Length of the free plan granted at registration.
pub const FREE_PLAN_DAYS: i64 = 30;

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub external_id: i64,
    pub display_name: Option<String>,
    pub free_generations: i64,
    pub stars: i64,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub free_plan_expires_at: NaiveDateTime,
}

impl User {
    pub fn has_available_free_generation(&self) -> bool {
        self.free_generations > 0
    }

    pub fn is_free_plan_active(&self, now: NaiveDateTime) -> bool {
        now < self.free_plan_expires_at
    }
}

/// Outcome of a registration attempt. `created` is false when the external
/// id was already registered; `credited_referrer` carries the user whose
/// code earned a bonus so the caller can notify them.
#[derive(Clone, Debug)]
pub struct Registration {
    pub user: User,
    pub created: bool,
    pub credited_referrer: Option<User>,
}

/// Render-ready balance projection for the front-end collaborator.
#[derive(Clone, Debug, Serialize)]
pub struct UserBalance {
    pub free_generations: i64,
    pub stars: i64,
    pub referral_code: String,
    pub plan_active: bool,
    pub days_left: i64,
}

impl UserBalance {
    pub fn of(user: &User, now: NaiveDateTime) -> Self {
        let plan_active = user.is_free_plan_active(now);
        let days_left = if plan_active {
            (user.free_plan_expires_at - now).num_days()
        } else {
            0
        };

        UserBalance {
            free_generations: user.free_generations,
            stars: user.stars,
            referral_code: user.referral_code.clone(),
            plan_active,
            days_left,
        }
    }
}
