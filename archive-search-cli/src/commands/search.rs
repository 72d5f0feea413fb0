use std::path::Path;

use anyhow::{Context, Result, bail};
use archive_search::model::Role;
use archive_search::policy::Membership;
use archive_search::{Principal, RawSearchParams};

use crate::cli::{LanguagesCommand, SearchCommand};
use crate::context;
use crate::output::{self, OutputFormat};

/// Execute a search command.
pub fn run(
    cmd: SearchCommand,
    config: Option<&Path>,
    store: &Path,
    format: OutputFormat,
) -> Result<()> {
    let principal = principal(&cmd)?;
    let ctx = context::open_indexed(config, store)?;

    let sites = cmd.sites.clone();
    let params = RawSearchParams {
        q: cmd.query,
        types: cmd.types,
        domain: cmd.domain,
        starts_with_char: cmd.starts_with,
        category: cmd.category,
        kids: cmd.kids,
        games: cmd.games,
        visibility: cmd.visibility,
        min_words: cmd.min_words,
        max_words: cmd.max_words,
        sort: cmd.sort,
        page: cmd.page,
        page_size: cmd.page_size,
        ..Default::default()
    };

    let request = ctx.service.request_for(&principal, params, &sites)?;
    if let Some(reason) = request.empty_reason() {
        tracing::info!("Request matches nothing: {reason:?}");
    }
    let page = ctx.service.search(&request).context("Search failed")?;
    output::print_page(&page, format)
}

/// Execute a languages command.
pub fn run_languages(
    cmd: LanguagesCommand,
    config: Option<&Path>,
    store: &Path,
    format: OutputFormat,
) -> Result<()> {
    let ctx = context::open_indexed(config, store)?;
    let page = ctx
        .service
        .search_languages(cmd.query.as_deref(), cmd.page, cmd.page_size)
        .context("Language search failed")?;
    output::print_page(&page, format)
}

fn principal(cmd: &SearchCommand) -> Result<Principal> {
    if cmd.staff {
        return Ok(Principal::staff("cli"));
    }
    if cmd.member.is_empty() {
        return Ok(Principal::anonymous());
    }

    let mut memberships = Vec::with_capacity(cmd.member.len());
    for value in &cmd.member {
        memberships.push(parse_membership(value)?);
    }
    Ok(Principal {
        user_id: Some("cli".into()),
        is_staff: false,
        memberships,
    })
}

/// `SITE` or `SITE:ROLE`; the role defaults to member.
fn parse_membership(value: &str) -> Result<Membership> {
    let (site_id, role) = match value.split_once(':') {
        Some((site, role)) => (site.trim(), role.parse::<Role>()?),
        None => (value.trim(), Role::Member),
    };
    if site_id.is_empty() {
        bail!("Membership '{value}' has no site");
    }
    Ok(Membership {
        site_id: site_id.to_string(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_membership() {
        let plain = parse_membership("s1").unwrap();
        assert_eq!(plain.site_id, "s1");
        assert_eq!(plain.role, Role::Member);

        let editor = parse_membership("s2:editor").unwrap();
        assert_eq!(editor.role, Role::Editor);

        assert!(parse_membership(":editor").is_err());
        assert!(parse_membership("s1:owner").is_err());
    }
}
