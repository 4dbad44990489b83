//! Deployment presets for the restaurant-ordering app's four worker scopes.

use std::time::Duration;
use url::Url;

use crate::config::{NotificationDefaults, ScopeConfig, ShellStrategy};

const APP: &str = "meu-burguer";
const FAVICON: &str = "/assets/favicon/android-chrome-192x192.png";

fn order_actions() -> Vec<(String, String)> {
    vec![
        ("view".to_string(), "Ver Pedido".to_string()),
        ("close".to_string(), "Fechar".to_string()),
    ]
}

/// Public menu site: root scope, network-first shell, cache-first statics.
/// Push defaults target the admin order list; order alerts are wired through
/// the root registration.
pub fn client(origin: Url) -> ScopeConfig {
    ScopeConfig {
        app: APP.to_string(),
        scope_prefix: "/".to_string(),
        scope_tag: "client".to_string(),
        version: "1.0.5".to_string(),
        origin,
        api_host_fragments: vec!["supabase".to_string()],
        api_path_prefixes: vec!["/api".to_string()],
        static_asset_prefixes: vec!["/_next/static".to_string()],
        excluded_prefixes: vec!["/admin".to_string(), "/entregador".to_string()],
        shell_strategy: ShellStrategy::NetworkFirst,
        max_age: Duration::from_secs(10 * 60),
        network_timeout: Duration::from_secs(3),
        essential_assets: vec!["/".to_string(), "/offline.html".to_string()],
        offline_fallback_path: "/offline.html".to_string(),
        legacy_cache_prefixes: vec![
            "meu-burguer-v".to_string(),
            "meu-burguer-admin-v1.0.0".to_string(),
        ],
        notification_defaults: NotificationDefaults {
            title: "Novo Pedido!".to_string(),
            body: "Você tem um novo pedido".to_string(),
            icon: FAVICON.to_string(),
            badge: FAVICON.to_string(),
            tag: "novo-pedido".to_string(),
            target_url: "/admin/pedidos".to_string(),
            vibration: vec![200, 100, 200],
            actions: order_actions(),
        },
    }
}

/// Admin dashboard: `/admin` scope, network-first everywhere, 5 minute
/// freshness window.
pub fn admin(origin: Url) -> ScopeConfig {
    ScopeConfig {
        app: APP.to_string(),
        scope_prefix: "/admin".to_string(),
        scope_tag: "admin".to_string(),
        version: "1.0.1".to_string(),
        origin,
        api_host_fragments: vec!["supabase".to_string()],
        api_path_prefixes: vec!["/api".to_string()],
        static_asset_prefixes: vec![],
        excluded_prefixes: vec![],
        shell_strategy: ShellStrategy::NetworkFirst,
        max_age: Duration::from_secs(5 * 60),
        network_timeout: Duration::from_secs(3),
        essential_assets: vec!["/admin/dashboard".to_string(), "/offline.html".to_string()],
        offline_fallback_path: "/offline.html".to_string(),
        legacy_cache_prefixes: vec![],
        notification_defaults: NotificationDefaults {
            title: "Novo Pedido!".to_string(),
            body: "Você tem um novo pedido".to_string(),
            icon: FAVICON.to_string(),
            badge: FAVICON.to_string(),
            tag: "novo-pedido".to_string(),
            target_url: "/admin/dashboard".to_string(),
            vibration: vec![200, 100, 200],
            actions: order_actions(),
        },
    }
}

/// Delivery panel: `/entregador` scope, 3 minute freshness window for
/// near-realtime order data, its own offline page and logo in the manifest.
pub fn delivery(origin: Url) -> ScopeConfig {
    ScopeConfig {
        app: APP.to_string(),
        scope_prefix: "/entregador".to_string(),
        scope_tag: "entregador".to_string(),
        version: "1.1.0".to_string(),
        origin,
        api_host_fragments: vec!["supabase".to_string()],
        api_path_prefixes: vec!["/api".to_string()],
        static_asset_prefixes: vec![],
        excluded_prefixes: vec![],
        shell_strategy: ShellStrategy::NetworkFirst,
        max_age: Duration::from_secs(3 * 60),
        network_timeout: Duration::from_secs(3),
        essential_assets: vec![
            "/entregador".to_string(),
            "/offline-entregador.html".to_string(),
            "/assets/meuburger.png".to_string(),
        ],
        offline_fallback_path: "/offline-entregador.html".to_string(),
        legacy_cache_prefixes: vec![],
        notification_defaults: NotificationDefaults {
            title: "🛵 Nova Entrega!".to_string(),
            body: "Você tem uma nova entrega disponível".to_string(),
            icon: "/assets/meuburger.png".to_string(),
            badge: "/assets/meuburger.png".to_string(),
            tag: "nova-entrega".to_string(),
            target_url: "/entregador".to_string(),
            vibration: vec![200, 100, 200, 100, 200],
            actions: vec![],
        },
    }
}

/// Simpler general-site variant: stale-while-revalidate shell, no push wiring
/// beyond defaults.
pub fn site(origin: Url) -> ScopeConfig {
    ScopeConfig {
        app: APP.to_string(),
        scope_prefix: "/".to_string(),
        scope_tag: "site".to_string(),
        version: "1.0.0".to_string(),
        origin,
        api_host_fragments: vec!["supabase".to_string()],
        api_path_prefixes: vec!["/api".to_string()],
        static_asset_prefixes: vec!["/_next/static".to_string()],
        excluded_prefixes: vec![],
        shell_strategy: ShellStrategy::StaleWhileRevalidate,
        max_age: Duration::from_secs(10 * 60),
        network_timeout: Duration::from_secs(3),
        essential_assets: vec!["/".to_string(), "/offline.html".to_string()],
        offline_fallback_path: "/offline.html".to_string(),
        legacy_cache_prefixes: vec![],
        notification_defaults: NotificationDefaults {
            title: "Meu Burguer".to_string(),
            body: String::new(),
            icon: FAVICON.to_string(),
            badge: FAVICON.to_string(),
            tag: "meu-burguer".to_string(),
            target_url: "/".to_string(),
            vibration: vec![],
            actions: vec![],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://meuburguer.example").unwrap()
    }

    #[test]
    fn scope_tags_are_distinct() {
        let tags = [
            client(origin()).scope_tag,
            admin(origin()).scope_tag,
            delivery(origin()).scope_tag,
            site(origin()).scope_tag,
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in tags.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn delivery_manifest_includes_logo() {
        let config = delivery(origin());
        assert_eq!(config.essential_assets.len(), 3);
        assert!(config
            .essential_assets
            .contains(&"/assets/meuburger.png".to_string()));
        assert_eq!(config.offline_fallback_path, "/offline-entregador.html");
    }

    #[test]
    fn freshness_windows_match_scopes() {
        assert_eq!(admin(origin()).max_age, Duration::from_secs(300));
        assert_eq!(delivery(origin()).max_age, Duration::from_secs(180));
        assert_eq!(client(origin()).max_age, Duration::from_secs(600));
    }

    #[test]
    fn site_variant_uses_stale_while_revalidate() {
        assert_eq!(
            site(origin()).shell_strategy,
            ShellStrategy::StaleWhileRevalidate
        );
    }
}
