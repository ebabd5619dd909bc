//! Authoritative DNS artifacts: typed zones and the local-zone declaration.
//!
//! Rendering is deterministic: the same zone with the same serial always
//! produces the same bytes. Only [`next_serial`] looks at the calendar, and
//! it takes the date as an argument.

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};

use crate::domain::context::ProvisioningContext;
use crate::domain::paths::DKIM_SELECTOR;

/// Default TTL written as `$TTL`.
pub const DEFAULT_TTL: u32 = 3600;
/// Preference of the single MX record.
pub const MX_PREFERENCE: u16 = 10;

const TXT_CHUNK: usize = 255;

// ── Serial ───────────────────────────────────────────────────────────────────

/// `YYYYMMDD00` for `date`.
#[must_use]
pub fn date_serial(date: NaiveDate) -> u32 {
    date.year().unsigned_abs() * 1_000_000 + date.month() * 10_000 + date.day() * 100
}

/// Serial for the next write of a zone.
///
/// Uses `YYYYMMDDnn`. When the previous serial is already at or past today's
/// base (a second run on the same day, or a clock that went backwards) the
/// previous value is incremented instead, so serials never regress.
#[must_use]
pub fn next_serial(previous: Option<u32>, today: NaiveDate) -> u32 {
    let base = date_serial(today);
    match previous {
        Some(prev) if prev >= base => prev.saturating_add(1),
        _ => base,
    }
}

/// Read the serial back out of a rendered zone file.
#[must_use]
pub fn parse_serial(zone_text: &str) -> Option<u32> {
    zone_text.lines().find_map(|line| {
        let (value, comment) = line.split_once(';')?;
        (comment.trim() == "serial")
            .then(|| value.trim().parse().ok())
            .flatten()
    })
}

// ── Records ──────────────────────────────────────────────────────────────────

/// Start of authority parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    /// Primary name server, fully qualified with trailing dot.
    pub mname: String,
    /// Responsible mailbox in DNS form (`hostmaster.example.com.`).
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// Record payloads the provisioned zones use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(String),
    Mx { preference: u16, exchange: String },
    Txt(String),
}

impl RecordData {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            RecordData::A(_) => "A",
            RecordData::Aaaa(_) => "AAAA",
            RecordData::Ns(_) => "NS",
            RecordData::Mx { .. } => "MX",
            RecordData::Txt(_) => "TXT",
        }
    }

    /// Address record of the right family for `ip`.
    #[must_use]
    pub fn address(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => RecordData::A(v4),
            IpAddr::V6(v6) => RecordData::Aaaa(v6),
        }
    }

    fn render(&self) -> String {
        match self {
            RecordData::A(ip) => ip.to_string(),
            RecordData::Aaaa(ip) => ip.to_string(),
            RecordData::Ns(host) => host.clone(),
            RecordData::Mx {
                preference,
                exchange,
            } => format!("{preference} {exchange}"),
            RecordData::Txt(value) => render_txt(value),
        }
    }
}

/// Quote a TXT value, splitting it into 255-byte character-strings.
fn render_txt(value: &str) -> String {
    let escaped: Vec<String> = value
        .as_bytes()
        .chunks(TXT_CHUNK)
        .map(|chunk| {
            let s = String::from_utf8_lossy(chunk);
            format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
        })
        .collect();
    if escaped.len() == 1 {
        escaped.into_iter().collect()
    } else {
        format!("( {} )", escaped.join(" "))
    }
}

/// One resource record with a fully-qualified owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub owner: String,
    pub data: RecordData,
}

impl ResourceRecord {
    #[must_use]
    pub fn new(owner: &str, data: RecordData) -> Self {
        Self {
            owner: fqdn(owner),
            data,
        }
    }
}

/// `name` with exactly one trailing dot.
#[must_use]
pub fn fqdn(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

// ── Zone ─────────────────────────────────────────────────────────────────────

/// A complete zone ready to be rendered as a BIND zone file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Zone apex without trailing dot.
    pub origin: String,
    pub default_ttl: u32,
    pub soa: Soa,
    pub records: Vec<ResourceRecord>,
}

impl Zone {
    /// Records of a given type, in insertion order.
    pub fn records_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a ResourceRecord> {
        self.records
            .iter()
            .filter(move |r| r.data.type_name() == type_name)
    }

    /// Render as BIND zone-file text.
    #[must_use]
    pub fn render(&self) -> String {
        let origin = fqdn(&self.origin);
        let soa = &self.soa;
        let mut out = String::new();
        let _ = writeln!(out, "; zone {origin} (managed by hostkit, rewritten on every run)");
        let _ = writeln!(out, "$ORIGIN {origin}");
        let _ = writeln!(out, "$TTL {}", self.default_ttl);
        let _ = writeln!(out, "{origin}\tIN\tSOA\t{} {} (", soa.mname, soa.rname);
        let _ = writeln!(out, "\t\t{}\t; serial", soa.serial);
        let _ = writeln!(out, "\t\t{}\t; refresh", soa.refresh);
        let _ = writeln!(out, "\t\t{}\t; retry", soa.retry);
        let _ = writeln!(out, "\t\t{}\t; expire", soa.expire);
        let _ = writeln!(out, "\t\t{} )\t; minimum", soa.minimum);
        for rec in &self.records {
            let _ = writeln!(
                out,
                "{}\tIN\t{}\t{}",
                rec.owner,
                rec.data.type_name(),
                rec.data.render()
            );
        }
        out
    }
}

fn soa_for(ctx: &ProvisioningContext, serial: u32) -> Soa {
    let [ns1, _] = ctx.ns_hosts();
    Soa {
        mname: fqdn(&ns1),
        rname: fqdn(&format!("hostmaster.{}", ctx.domain())),
        serial,
        refresh: 3600,
        retry: 900,
        expire: 1_209_600,
        minimum: 86_400,
    }
}

fn ns_records(ctx: &ProvisioningContext, owner: &str) -> Vec<ResourceRecord> {
    ctx.ns_hosts()
        .iter()
        .map(|ns| ResourceRecord::new(owner, RecordData::Ns(fqdn(ns))))
        .collect()
}

fn mx_record(ctx: &ProvisioningContext, owner: &str) -> ResourceRecord {
    ResourceRecord::new(
        owner,
        RecordData::Mx {
            preference: MX_PREFERENCE,
            exchange: fqdn(&ctx.mail_host()),
        },
    )
}

/// SPF policy allowing only this server to send for the domain.
#[must_use]
pub fn spf_policy(ip: IpAddr) -> String {
    let mech = match ip {
        IpAddr::V4(v4) => format!("ip4:{v4}"),
        IpAddr::V6(v6) => format!("ip6:{v6}"),
    };
    format!("v=spf1 mx a {mech} -all")
}

/// DMARC policy published at `_dmarc.<domain>`.
#[must_use]
pub fn dmarc_policy(ctx: &ProvisioningContext) -> String {
    format!(
        "v=DMARC1; p=quarantine; rua=mailto:{}; pct=100; adkim=s; aspf=s",
        ctx.postmaster()
    )
}

/// Zone for the primary domain.
///
/// `dkim_txt` is the public-key record value once a signing key exists.
#[must_use]
pub fn primary_zone(ctx: &ProvisioningContext, serial: u32, dkim_txt: Option<&str>) -> Zone {
    let domain = ctx.domain();
    let address = RecordData::address(ctx.server_ip());
    let mut records = ns_records(ctx, domain);
    for ns in ctx.ns_hosts() {
        records.push(ResourceRecord::new(&ns, address.clone()));
    }
    records.push(ResourceRecord::new(domain, address.clone()));
    records.push(ResourceRecord::new(&format!("www.{domain}"), address.clone()));
    records.push(ResourceRecord::new(&ctx.mail_host(), address));
    records.push(mx_record(ctx, domain));
    records.push(ResourceRecord::new(
        domain,
        RecordData::Txt(spf_policy(ctx.server_ip())),
    ));
    records.push(ResourceRecord::new(
        &format!("_dmarc.{domain}"),
        RecordData::Txt(dmarc_policy(ctx)),
    ));
    if let Some(value) = dkim_txt {
        records.push(ResourceRecord::new(
            &dkim_record_name(domain),
            RecordData::Txt(value.to_string()),
        ));
    }
    Zone {
        origin: domain.to_string(),
        default_ttl: DEFAULT_TTL,
        soa: soa_for(ctx, serial),
        records,
    }
}

/// Zone for the mail subdomain.
#[must_use]
pub fn mail_zone(ctx: &ProvisioningContext, serial: u32) -> Zone {
    let mail = ctx.mail_host();
    let mut records = ns_records(ctx, &mail);
    records.push(ResourceRecord::new(
        &mail,
        RecordData::address(ctx.server_ip()),
    ));
    records.push(mx_record(ctx, &mail));
    Zone {
        origin: mail,
        default_ttl: DEFAULT_TTL,
        soa: soa_for(ctx, serial),
        records,
    }
}

/// Owner name of the DKIM public-key record.
#[must_use]
pub fn dkim_record_name(domain: &str) -> String {
    format!("{DKIM_SELECTOR}._domainkey.{domain}")
}

/// Glue the operator has to register so the domain delegates to this host.
#[must_use]
pub fn registrar_glue(ctx: &ProvisioningContext) -> Vec<String> {
    let address = RecordData::address(ctx.server_ip());
    ctx.ns_hosts()
        .iter()
        .map(|ns| {
            format!(
                "{}\tIN\t{}\t{}",
                fqdn(ns),
                address.type_name(),
                ctx.server_ip()
            )
        })
        .collect()
}

// ── Local-zone declaration ───────────────────────────────────────────────────

/// A `zone { ... }` stanza in `named.conf.local`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDeclaration {
    pub zone: String,
    pub file: PathBuf,
}

/// Render `named.conf.local` declaring every managed zone as master.
#[must_use]
pub fn render_local_zones(zones: &[ZoneDeclaration]) -> String {
    let mut out = String::from("// managed by hostkit, rewritten on every run\n");
    for decl in zones {
        let _ = write!(
            out,
            "\nzone \"{}\" {{\n\ttype master;\n\tfile \"{}\";\n\tallow-transfer {{ none; }};\n}};\n",
            decl.zone,
            decl.file.display()
        );
    }
    out
}
