//! The site's route table, compiled from configuration.

use std::path::Path;

use crate::backends::{
    Backend, CgiHandler, DocsRedirect, FixedRedirect, GitwebHandler, InterfaceAddr, IssueRedirect,
    ProxyTargetError, ReverseProxy, StaticTree, TlsGate, UrlFixer,
};
use crate::config::SiteConfig;
use crate::routing::matcher::{AndMatcher, ExactPathMatcher, HostMatcher, PathPrefixMatcher};
use crate::routing::router::Router;

pub const GITWEB_MOUNT: &str = "/code/";

/// Build the route table. Optional backends that are not configured simply
/// have no route, so their paths fall through to content.
pub fn site_routes(config: &SiteConfig) -> Result<Router, ProxyTargetError> {
    let static_root = config.static_root();
    let mut builder = Router::builder()
        .route(
            "favicon",
            ExactPathMatcher::new("/favicon.ico"),
            Backend::Static(StaticTree::new(&static_root)),
        )
        .route(
            "robots",
            ExactPathMatcher::new("/robots.txt"),
            Backend::Static(StaticTree::new(&static_root)),
        )
        .route(
            "static",
            PathPrefixMatcher::new("/static/"),
            Backend::Static(StaticTree::stripped("/static/", &static_root)),
        )
        .route(
            "talks",
            PathPrefixMatcher::new("/talks/"),
            Backend::Static(StaticTree::stripped("/talks/", config.talks_root())),
        );

    if let Some(docs) = &config.site.docs_base_url {
        let docs = DocsRedirect::new(docs);
        builder = builder
            .route("pkg", PathPrefixMatcher::new("/pkg/"), Backend::Docs(docs.clone()))
            .route("cmd", PathPrefixMatcher::new("/cmd/"), Backend::Docs(docs));
    }

    if let Some(url) = config.gerrit.web_url() {
        let gate = TlsGate::new(
            ReverseProxy::new(&url)?,
            config.https_enabled(),
            &config.site.canonical_host,
        );
        builder = builder.route("review", PathPrefixMatcher::new("/r/"), Backend::TlsGated(gate));
    }

    builder = builder.route(
        "debugz-ip",
        ExactPathMatcher::new("/debugz/ip"),
        Backend::InterfaceAddr(InterfaceAddr::new(
            &config.diagnostics.ip_program,
            &config.diagnostics.interface,
        )),
    );

    builder = builder.route(
        "code-slash",
        ExactPathMatcher::new("/code"),
        Backend::Redirect(FixedRedirect::new(GITWEB_MOUNT)),
    );

    if let Some(script) = &config.gitweb.script {
        builder = builder.route(
            "code",
            PathPrefixMatcher::new(GITWEB_MOUNT),
            Backend::Gitweb(gitweb(config, script)),
        );
    }

    builder = builder.route(
        "issue",
        PathPrefixMatcher::new("/issue/"),
        Backend::Issue(IssueRedirect::new("/issue/", &config.site.issue_tracker_url)),
    );

    if let Some((host, backend)) = config.buildbot.route() {
        builder = builder.route(
            "buildbot",
            AndMatcher::new(vec![
                Box::new(HostMatcher::new(host)),
                Box::new(PathPrefixMatcher::new("/")),
            ]),
            Backend::Proxy(ReverseProxy::new(backend)?),
        );
    }

    Ok(builder.build())
}

fn gitweb(config: &SiteConfig, script: &Path) -> UrlFixer {
    let root = &config.site.root;
    let cgi = CgiHandler::new(script, GITWEB_MOUNT)
        .with_env(
            "GITWEB_CONFIG",
            root.join(&config.gitweb.config_file).display().to_string(),
        )
        .with_env("CAMWEB_ROOT", root.display().to_string())
        .with_env("CAMWEB_GITDIR", config.mirror_dir().display().to_string());
    let assets = StaticTree::stripped(GITWEB_MOUNT, config.gitweb.resolve_static_files());

    UrlFixer::new(
        &config.filter.corrupted_sequence,
        &config.filter.replacement,
        GitwebHandler::new(GITWEB_MOUNT, cgi, assets),
    )
}
