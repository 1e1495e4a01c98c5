// End-to-end account linking against the in-process directory
use std::sync::Arc;

use tendero::identity::{
    AuthErrorCode, FederatedProfile, IdentityClient, LocalDirectory, Provider, SignInMethod,
};
use tendero::linking::{AccountLinkResolver, EmailEntry, ProviderUserApi};
use tendero::testing::{
    conflict_error, federated_identity, password_identity, MockIdentityClient, MockUserApi,
};
use tendero::LinkError;

fn wired() -> (Arc<LocalDirectory>, AccountLinkResolver) {
    let directory = Arc::new(LocalDirectory::new());
    let client: Arc<dyn IdentityClient> = directory.clone();
    let user_api: Arc<dyn ProviderUserApi> = directory.clone();
    let resolver = AccountLinkResolver::new(client, user_api);
    (directory, resolver)
}

#[tokio::test]
async fn google_conflict_with_password_account_requires_manual_step() {
    let (directory, resolver) = wired();
    directory
        .register_with_email_and_password("ana@example.com", "secreta", Some("Ana"))
        .await
        .unwrap();
    directory.sign_out().await;
    directory.connect_profile(FederatedProfile::new(Provider::Google, "ana@example.com"));

    let err = directory
        .sign_in_interactive(Provider::Google)
        .await
        .unwrap_err();
    assert_eq!(err.code, AuthErrorCode::AccountExistsWithDifferentCredential);

    let outcome = resolver
        .resolve_provider_conflict(&err, Provider::Google)
        .await
        .unwrap_err();
    assert!(matches!(outcome, LinkError::ManualStepRequired(_)));

    // Nobody got signed in as a side effect
    assert!(directory.current_user().await.is_none());
}

#[tokio::test]
async fn github_conflict_with_google_account_merges_automatically() {
    let (directory, resolver) = wired();

    // Account exists under Google
    directory.connect_profile(
        FederatedProfile::new(Provider::Google, "ana@example.com").with_display_name("Ana"),
    );
    directory
        .sign_in_interactive(Provider::Google)
        .await
        .unwrap();
    directory.sign_out().await;

    // Same email behind GitHub, kept private there
    directory.connect_profile(
        FederatedProfile::new(Provider::GitHub, "ana@example.com").with_public_email(false),
    );
    let err = directory
        .sign_in_interactive(Provider::GitHub)
        .await
        .unwrap_err();
    assert!(err.email.is_none());

    let merged = resolver
        .resolve_provider_conflict(&err, Provider::GitHub)
        .await
        .unwrap();
    assert!(merged.has_provider("google.com"));
    assert!(merged.has_provider("github.com"));

    // The merged account is now signed in and answers for both providers
    let current = directory.current_user().await.unwrap();
    assert_eq!(current.uid, merged.uid);
    let methods = directory
        .fetch_sign_in_methods_for_email("ana@example.com")
        .await
        .unwrap();
    assert!(methods.contains(&SignInMethod::Federated(Provider::Google)));
    assert!(methods.contains(&SignInMethod::Federated(Provider::GitHub)));
}

#[tokio::test]
async fn hidden_email_recovered_from_emails_endpoint_by_priority() {
    let (directory, resolver) = wired();

    directory.connect_profile(FederatedProfile::new(Provider::Google, "primary@x.com"));
    directory
        .sign_in_interactive(Provider::Google)
        .await
        .unwrap();
    directory.sign_out().await;

    // GitHub account lists several addresses; only primary+verified matches
    // the existing account
    directory.connect_profile(
        FederatedProfile::new(Provider::GitHub, "primary@x.com")
            .with_public_email(false)
            .with_emails(vec![
                EmailEntry {
                    email: "noreply@users.example".to_string(),
                    primary: false,
                    verified: false,
                },
                EmailEntry {
                    email: "primary@x.com".to_string(),
                    primary: true,
                    verified: true,
                },
            ]),
    );
    let err = directory
        .sign_in_interactive(Provider::GitHub)
        .await
        .unwrap_err();

    let merged = resolver
        .resolve_provider_conflict(&err, Provider::GitHub)
        .await
        .unwrap();
    assert!(merged.has_provider("github.com"));
    assert_eq!(merged.email, Some("primary@x.com".to_string()));
}

#[tokio::test]
async fn voluntary_link_adds_provider_to_signed_in_account() {
    let (directory, resolver) = wired();
    directory
        .register_with_email_and_password("ana@example.com", "secreta", Some("Ana"))
        .await
        .unwrap();
    directory.connect_profile(FederatedProfile::new(Provider::Facebook, "ana@example.com"));

    let identity = directory.current_user().await.unwrap();
    let linked = resolver
        .link_provider_to_current_user(&identity, Provider::Facebook)
        .await
        .unwrap();
    assert!(linked.has_provider("password"));
    assert!(linked.has_provider("facebook.com"));

    // A second attempt reports the provider as already linked
    let err = resolver
        .link_provider_to_current_user(&linked, Provider::Facebook)
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::AlreadyLinked));
}

#[tokio::test]
async fn resolver_links_exactly_the_pending_credential() {
    let merged = federated_identity(Provider::Google);
    let client = Arc::new(
        MockIdentityClient::new()
            .with_sign_in_methods(
                "ana@example.com",
                vec![SignInMethod::Federated(Provider::Google)],
            )
            .with_interactive_identity(Provider::Google, merged.clone())
            .with_link_result(Ok(merged)),
    );
    let resolver = AccountLinkResolver::new(client.clone(), Arc::new(MockUserApi::new()));

    resolver
        .resolve_provider_conflict(
            &conflict_error(Provider::GitHub, Some("ana@example.com"), "gh_tok"),
            Provider::GitHub,
        )
        .await
        .unwrap();

    // One popup, one link write, carrying the original token
    assert_eq!(client.interactive_sign_ins(), vec![Provider::Google]);
    let linked = client.linked_credentials();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].token, "gh_tok");
}

#[tokio::test]
async fn voluntary_link_delegates_to_interactive_prompt() {
    let client = Arc::new(MockIdentityClient::new());
    let resolver = AccountLinkResolver::new(client.clone(), Arc::new(MockUserApi::new()));

    let linked = resolver
        .link_provider_to_current_user(&password_identity(), Provider::Google)
        .await
        .unwrap();
    assert!(linked.has_provider("password"));
    assert!(linked.has_provider("google.com"));
    assert_eq!(client.interactive_links(), vec![Provider::Google]);
}

#[tokio::test]
async fn non_conflict_errors_pass_through_verbatim() {
    let client = Arc::new(MockIdentityClient::new());
    let api = Arc::new(MockUserApi::new());
    let resolver = AccountLinkResolver::new(client, api);

    let err = tendero::identity::AuthError::new(AuthErrorCode::Network, "socket closed");
    let outcome = resolver
        .resolve_provider_conflict(&err, Provider::Google)
        .await
        .unwrap_err();
    match outcome {
        LinkError::Provider { code, message } => {
            assert_eq!(code, "auth/network-request-failed");
            assert_eq!(message, "socket closed");
        }
        other => panic!("expected Provider error, got {other:?}"),
    }
}
