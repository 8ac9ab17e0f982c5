//! Resolution of the acting profile from the command line.

use anyhow::{Context, Result};
use rollcall_core::ProfileId;

/// Turn `--actor` (a profile id or a username) into a profile id.
///
/// Usernames are looked up through `by_username`; ids are taken as given.
pub fn resolve<F>(actor: Option<&str>, by_username: F) -> Result<Option<ProfileId>>
where
    F: FnOnce(&str) -> Result<ProfileId>,
{
    let Some(actor) = actor.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if let Ok(id) = actor.parse::<ProfileId>() {
        return Ok(Some(id));
    }
    by_username(actor)
        .with_context(|| format!("unknown actor '{actor}'"))
        .map(Some)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use anyhow::anyhow;

    #[test]
    fn missing_or_blank_actor_is_anonymous() {
        assert_eq!(resolve(None, |_| unreachable!()).unwrap(), None);
        assert_eq!(resolve(Some("  "), |_| unreachable!()).unwrap(), None);
    }

    #[test]
    fn ids_skip_the_username_lookup() {
        let id = ProfileId::new();
        let resolved = resolve(Some(&id.to_string()), |_| unreachable!()).unwrap();
        assert_eq!(resolved, Some(id));
    }

    #[test]
    fn usernames_go_through_the_lookup() {
        let id = ProfileId::new();
        let resolved = resolve(Some("ana"), |name| {
            assert_eq!(name, "ana");
            Ok(id)
        })
        .unwrap();
        assert_eq!(resolved, Some(id));
    }

    #[test]
    fn failed_lookup_names_the_actor() {
        let err = resolve(Some("ghost"), |_| Err(anyhow!("no such profile"))).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
