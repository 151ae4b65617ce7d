use tokio::sync::watch;

use crate::models::Principal;

/// Source of the currently authenticated principal.
pub trait IdentityProvider: Send + Sync {
    fn current_principal(&self) -> Option<Principal>;
    /// Receiver that observes every sign-in and sign-out transition.
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;
}

/// Identity provider driven by explicit sign-in and sign-out calls.
#[derive(Debug)]
pub struct Session {
    current: watch::Sender<Option<Principal>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// Returns `false` when `principal` was already signed in.
    pub fn sign_in(&self, principal: Principal) -> bool {
        self.current.send_if_modified(|current| {
            if current.as_ref() == Some(&principal) {
                return false;
            }
            log::info!("event=sign_in module=identity status=ok uid={}", principal.uid);
            *current = Some(principal);
            true
        })
    }

    /// Returns `false` when nobody was signed in.
    pub fn sign_out(&self) -> bool {
        self.current.send_if_modified(|current| match current.take() {
            Some(previous) => {
                log::info!("event=sign_out module=identity status=ok uid={}", previous.uid);
                true
            }
            None => false,
        })
    }
}

impl IdentityProvider for Session {
    fn current_principal(&self) -> Option<Principal> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.current.subscribe()
    }
}
