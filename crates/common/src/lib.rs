pub mod types;
pub mod utils;
pub mod metrics;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn current_user_roundtrips_as_json() {
        let id = uuid::Uuid::new_v4();
        let json = serde_json::to_value(types::CurrentUser { id }).unwrap();
        assert_eq!(json["id"], id.to_string());
    }
}
