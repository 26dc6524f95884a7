//! Request routing
//!
//! One call per decoded request: checks the session state, drives the
//! account or mailbox operation, and says what the connection loop
//! should do next. User-fixable failures become `ERROR` responses;
//! storage and transport failures propagate so the caller tears the
//! connection down without answering.
//!
//! Fixed policy for the state machine's edges: requests that need an
//! identity are rejected with an explicit error while unauthenticated,
//! and `AUTH_REGISTER`/`AUTH_LOGIN` are rejected while one is already
//! attached. `AUTH_LOGOUT` is a fire-and-forget notice either way.

#![allow(clippy::future_not_send)]

use crate::error::{DeliveryFailure, Error, Result};
use crate::proto::{Email, OkPayload, Request, Response};
use crate::session::Session;
use crate::storage::Storage;
use crate::{account, mailbox};
use tracing::{debug, info};

/// What the connection loop should do after a request.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Write this response and keep serving the connection.
    Reply(Response),
    /// No response frame is owed (logout notice).
    Quiet,
    /// Close the connection without writing anything (quit notice).
    Close,
}

const AUTH_REQUIRED: &str = "you must be signed in to do that";
const ALREADY_SIGNED_IN: &str = "already signed in";

/// Route one request through the session state machine.
///
/// # Errors
///
/// Returns [`Error::Io`] when storage fails mid-request; the
/// connection must then be torn down without a response. Every other
/// failure comes back as an `ERROR` reply to write out.
#[allow(clippy::too_many_lines)]
pub async fn dispatch<S: Storage>(
    storage: &S,
    domain: &str,
    session: &mut Session,
    request: Request,
) -> Result<Dispatch> {
    debug!(
        authenticated = session.is_authenticated(),
        kind = request.kind(),
        "dispatching"
    );

    match request {
        Request::AuthRegister(creds) => {
            if session.is_authenticated() {
                return Ok(Dispatch::Reply(Response::error(ALREADY_SIGNED_IN)));
            }
            reply(
                account::register(storage, &creds.username, &creds.password)
                    .await
                    .map(|canonical| {
                        info!(user = %canonical, "account created");
                        // Registration doubles as login.
                        session.login(canonical);
                        None
                    }),
            )
        }
        Request::AuthLogin(creds) => {
            if session.is_authenticated() {
                return Ok(Dispatch::Reply(Response::error(ALREADY_SIGNED_IN)));
            }
            reply(
                account::authenticate(storage, &creds.username, &creds.password)
                    .await
                    .map(|canonical| {
                        info!(user = %canonical, "signed in");
                        session.login(canonical);
                        None
                    }),
            )
        }
        Request::AuthLogout => {
            session.logout();
            Ok(Dispatch::Quiet)
        }
        Request::InboxList => {
            let Some(user) = session.username() else {
                return Ok(Dispatch::Reply(Response::error(AUTH_REQUIRED)));
            };
            reply(
                mailbox::list(storage, user)
                    .await
                    .map(|email_list| Some(OkPayload::EmailList { email_list })),
            )
        }
        Request::InboxFetch(choice) => {
            let Some(user) = session.username() else {
                return Ok(Dispatch::Reply(Response::error(AUTH_REQUIRED)));
            };
            reply(
                mailbox::fetch(storage, user, choice.choice)
                    .await
                    .map(|email| Some(OkPayload::EmailContent(email))),
            )
        }
        Request::EmailSend(email) => {
            if !session.is_authenticated() {
                return Ok(Dispatch::Reply(Response::error(AUTH_REQUIRED)));
            }
            reply(resolve_send(storage, domain, &email).await.map(|()| None))
        }
        Request::Stats => {
            let Some(user) = session.username() else {
                return Ok(Dispatch::Reply(Response::error(AUTH_REQUIRED)));
            };
            reply(
                mailbox::stats(storage, user)
                    .await
                    .map(|(count, size)| Some(OkPayload::Stats { count, size })),
            )
        }
        Request::Bye => Ok(Dispatch::Close),
    }
}

/// Deliver internally or archive to the dead-letter area.
///
/// The destination's domain half decides: our domain and a known
/// local account means append; our domain but no such account, or any
/// foreign domain (or no domain at all), means dead-letter plus an
/// error. The message content is preserved in every branch.
async fn resolve_send<S: Storage>(storage: &S, domain: &str, email: &Email) -> Result<()> {
    let local_recipient = email
        .destination
        .rsplit_once('@')
        .filter(|(_, dest_domain)| dest_domain.eq_ignore_ascii_case(domain))
        .map(|(local, _)| account::canonical_username(local));

    let Some(recipient) = local_recipient else {
        storage.write_dead_letter(email).await?;
        return Err(Error::Delivery(DeliveryFailure::ExternalRecipient));
    };

    if !storage.account_exists(&recipient).await? {
        storage.write_dead_letter(email).await?;
        return Err(Error::Delivery(DeliveryFailure::UnknownRecipient));
    }

    mailbox::append(storage, &recipient, email).await
}

/// Turn an operation result into a wire response, letting transport
/// and storage failures through untouched.
fn reply(result: Result<Option<OkPayload>>) -> Result<Dispatch> {
    match result {
        Ok(payload) => Ok(Dispatch::Reply(Response::Ok(payload))),
        Err(e @ (Error::Io(_) | Error::Transport(_))) => Err(e),
        Err(e) => Ok(Dispatch::Reply(Response::error(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Credentials, EmailChoice};
    use crate::storage::FsStorage;

    const DOMAIN: &str = "postdrop.local";

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn mail_to(destination: &str) -> Email {
        Email {
            sender: "alice@postdrop.local".to_string(),
            destination: destination.to_string(),
            subject: "hi".to_string(),
            date: "2024-05-01T12:00:00Z".to_string(),
            content: "hello\n".to_string(),
        }
    }

    async fn fresh() -> (tempfile::TempDir, FsStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).await.unwrap();
        (dir, storage)
    }

    async fn signed_in(storage: &FsStorage, username: &str) -> Session {
        let mut session = Session::new();
        let outcome = dispatch(
            storage,
            DOMAIN,
            &mut session,
            Request::AuthRegister(creds(username, "Str0ngPass!")),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Dispatch::Reply(Response::ok()));
        session
    }

    fn error_text(outcome: &Dispatch) -> &str {
        match outcome {
            Dispatch::Reply(Response::Error { error_message }) => error_message,
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registration_authenticates_the_session() {
        let (_dir, storage) = fresh().await;
        let session = signed_in(&storage, "alice").await;
        assert_eq!(session.username(), Some("ALICE"));
    }

    #[tokio::test]
    async fn failed_registration_leaves_the_session_unauthenticated() {
        let (_dir, storage) = fresh().await;
        let mut session = Session::new();

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut session,
            Request::AuthRegister(creds("alice", "weak")),
        )
        .await
        .unwrap();

        assert!(error_text(&outcome).contains("10 characters"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn authenticated_only_requests_are_rejected_when_signed_out() {
        let (_dir, storage) = fresh().await;

        for request in [
            Request::InboxList,
            Request::InboxFetch(EmailChoice { choice: 1 }),
            Request::EmailSend(mail_to("bob@postdrop.local")),
            Request::Stats,
        ] {
            let mut session = Session::new();
            let outcome = dispatch(&storage, DOMAIN, &mut session, request)
                .await
                .unwrap();
            assert_eq!(error_text(&outcome), AUTH_REQUIRED);
        }
    }

    #[tokio::test]
    async fn login_while_signed_in_is_rejected() {
        let (_dir, storage) = fresh().await;
        let mut session = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut session,
            Request::AuthLogin(creds("alice", "Str0ngPass!")),
        )
        .await
        .unwrap();

        assert_eq!(error_text(&outcome), ALREADY_SIGNED_IN);
        assert_eq!(session.username(), Some("ALICE"));
    }

    #[tokio::test]
    async fn logout_is_quiet_and_clears_the_identity() {
        let (_dir, storage) = fresh().await;
        let mut session = signed_in(&storage, "alice").await;

        let outcome = dispatch(&storage, DOMAIN, &mut session, Request::AuthLogout)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Quiet);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn bye_closes_without_a_response() {
        let (_dir, storage) = fresh().await;
        let mut session = Session::new();

        let outcome = dispatch(&storage, DOMAIN, &mut session, Request::Bye)
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::Close);
    }

    #[tokio::test]
    async fn internal_send_lands_in_the_recipient_mailbox() {
        let (_dir, storage) = fresh().await;
        signed_in(&storage, "bob").await;
        let mut alice = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::EmailSend(mail_to("bob@postdrop.local")),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Dispatch::Reply(Response::ok()));
        assert_eq!(storage.list_messages("BOB").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn destination_domain_comparison_ignores_case() {
        let (_dir, storage) = fresh().await;
        signed_in(&storage, "bob").await;
        let mut alice = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::EmailSend(mail_to("Bob@POSTDROP.LOCAL")),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Dispatch::Reply(Response::ok()));
        assert_eq!(storage.list_messages("BOB").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn external_send_is_dead_lettered_and_reported() {
        let (_dir, storage) = fresh().await;
        let mut alice = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::EmailSend(mail_to("someone@elsewhere.example")),
        )
        .await
        .unwrap();

        assert!(error_text(&outcome).contains("external"));
        let dead = std::fs::read_dir(storage.dead_letter_dir()).unwrap().count();
        assert_eq!(dead, 1);
    }

    #[tokio::test]
    async fn unknown_local_recipient_is_dead_lettered_and_reported() {
        let (_dir, storage) = fresh().await;
        let mut alice = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::EmailSend(mail_to("nobody@postdrop.local")),
        )
        .await
        .unwrap();

        assert!(error_text(&outcome).contains("does not exist"));
        let dead = std::fs::read_dir(storage.dead_letter_dir()).unwrap().count();
        assert_eq!(dead, 1);
        // No real mailbox received anything.
        assert!(storage.list_messages("ALICE").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn destination_without_a_domain_counts_as_external() {
        let (_dir, storage) = fresh().await;
        let mut alice = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::EmailSend(mail_to("just-a-name")),
        )
        .await
        .unwrap();

        assert!(error_text(&outcome).contains("external"));
    }

    #[tokio::test]
    async fn fetch_out_of_range_is_an_explicit_error() {
        let (_dir, storage) = fresh().await;
        let mut alice = signed_in(&storage, "alice").await;

        let outcome = dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::InboxFetch(EmailChoice { choice: 1 }),
        )
        .await
        .unwrap();

        assert!(error_text(&outcome).contains("no message"));
    }

    #[tokio::test]
    async fn stats_reflect_received_mail() {
        let (_dir, storage) = fresh().await;
        signed_in(&storage, "bob").await;
        let mut alice = signed_in(&storage, "alice").await;

        dispatch(
            &storage,
            DOMAIN,
            &mut alice,
            Request::EmailSend(mail_to("bob@postdrop.local")),
        )
        .await
        .unwrap();

        let mut bob = Session::new();
        dispatch(
            &storage,
            DOMAIN,
            &mut bob,
            Request::AuthLogin(creds("bob", "Str0ngPass!")),
        )
        .await
        .unwrap();
        let outcome = dispatch(&storage, DOMAIN, &mut bob, Request::Stats)
            .await
            .unwrap();

        match outcome {
            Dispatch::Reply(Response::Ok(Some(OkPayload::Stats { count, size }))) => {
                assert_eq!(count, 1);
                assert!(size > 0);
            }
            other => panic!("expected stats payload, got {other:?}"),
        }
    }
}
