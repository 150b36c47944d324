pub mod account;
pub mod character;
pub mod db;
pub mod error;
mod schema;

pub use account::{Account, AccountRepo};
pub use character::{CharacterRecord, CharacterRepo};
pub use db::PlayerDb;
pub use error::PlayerDbError;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const ZONE: &str = "starter-zone";

    #[test]
    fn open_memory_db() {
        let db = PlayerDb::open_memory().unwrap();
        assert!(db.account().get_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn create_account() {
        let db = PlayerDb::open_memory().unwrap();
        let account = db
            .account()
            .create("aria@example.com", "password123")
            .unwrap();
        assert_eq!(account.email, "aria@example.com");
        assert!(!account.created_at.is_empty());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("a@example.com", "pass1").unwrap();
        let result = db.account().create("a@example.com", "pass2");
        assert!(matches!(result, Err(PlayerDbError::EmailTaken(_))));
    }

    #[test]
    fn email_matching_is_case_insensitive() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("aria@example.com", "pass").unwrap();
        let result = db.account().create("ARIA@example.com", "pass2");
        assert!(matches!(result, Err(PlayerDbError::EmailTaken(_))));
    }

    #[test]
    fn verify_success() {
        let db = PlayerDb::open_memory().unwrap();
        let created = db.account().create("hero@example.com", "secret123").unwrap();
        let verified = db.account().verify("hero@example.com", "secret123").unwrap();
        assert_eq!(verified.id, created.id);
    }

    #[test]
    fn verify_wrong_password() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("hero@example.com", "secret123").unwrap();
        let result = db.account().verify("hero@example.com", "wrongpass");
        assert!(matches!(result, Err(PlayerDbError::InvalidPassword)));
    }

    #[test]
    fn verify_unknown_account() {
        let db = PlayerDb::open_memory().unwrap();
        let result = db.account().verify("ghost@example.com", "pass");
        assert!(matches!(result, Err(PlayerDbError::AccountNotFound(_))));
    }

    #[test]
    fn create_character_with_defaults() {
        let db = PlayerDb::open_memory().unwrap();
        let account = db.account().create("p1@example.com", "pass").unwrap();
        let character = db
            .character()
            .create(account.id, "Aria", "mage", ZONE)
            .unwrap();
        assert_eq!(character.name, "Aria");
        assert_eq!(character.account_id, account.id);
        assert_eq!(character.zone_id, ZONE);
        assert_eq!((character.pos_x, character.pos_y), (0.0, 0.0));
    }

    #[test]
    fn list_characters_for_account() {
        let db = PlayerDb::open_memory().unwrap();
        let account = db.account().create("multi@example.com", "pass").unwrap();
        let other = db.account().create("other@example.com", "pass").unwrap();
        db.character().create(account.id, "First", "mage", ZONE).unwrap();
        db.character()
            .create(account.id, "Second", "warrior", ZONE)
            .unwrap();
        db.character().create(other.id, "Elsewhere", "rogue", ZONE).unwrap();

        let list = db.character().list_for_account(account.id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "First");
        assert_eq!(list[1].name, "Second");
    }

    #[test]
    fn get_unknown_character_is_none() {
        let db = PlayerDb::open_memory().unwrap();
        assert!(db.character().get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn update_position_roundtrip() {
        let db = PlayerDb::open_memory().unwrap();
        let account = db.account().create("saver@example.com", "pass").unwrap();
        let character = db
            .character()
            .create(account.id, "Saver", "mage", ZONE)
            .unwrap();

        let updated = db
            .character()
            .update_position(account.id, character.id, 12.5, 7.25, ZONE)
            .unwrap();
        assert!(updated);

        let loaded = db.character().get(character.id).unwrap().unwrap();
        assert_eq!(loaded.pos_x, 12.5);
        assert_eq!(loaded.pos_y, 7.25);
    }

    #[test]
    fn update_position_wrong_owner_is_noop() {
        let db = PlayerDb::open_memory().unwrap();
        let owner = db.account().create("owner@example.com", "pass").unwrap();
        let thief = db.account().create("thief@example.com", "pass").unwrap();
        let character = db
            .character()
            .create(owner.id, "Mine", "mage", ZONE)
            .unwrap();

        let updated = db
            .character()
            .update_position(thief.id, character.id, 9.0, 9.0, ZONE)
            .unwrap();
        assert!(!updated);

        let loaded = db.character().get(character.id).unwrap().unwrap();
        assert_eq!((loaded.pos_x, loaded.pos_y), (0.0, 0.0));
    }
}
