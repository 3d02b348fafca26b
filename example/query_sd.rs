use std::fs;
use std::process;

use clap::{App, Arg};
use ntsecurity::{access_check, AccessCheckOptions, AccessToken, Ace, Acl, Principal, SecurityDescriptor, Sid};
use tracing_subscriber::EnvFilter;

fn process_entry(index: usize, ace: &Ace) {
    let sid = ace.principal();

    println!("  AccessControlEntry[{}] {{", index);
    println!("    Type={}", ace.ace_type());
    println!("    Flags={}", ace.flags());
    println!("    Sid={} ({})", sid, sid.resolve());
    println!("    Mask={}", ace.mask);
    println!("    RawMask=0x{:x}", ace.mask.raw());
    if let Some(guid) = ace.object_type() {
        println!("    ObjectType={}", guid.resolve());
    }
    if let Some(guid) = ace.inherited_object_type() {
        println!("    InheritedObjectType={}", guid.resolve());
    }
    println!("  }}");
}

fn process_acl(name: &str, acl: &Acl) {
    println!("{} {{", name);
    for (i, ace) in acl.all().iter().enumerate() {
        process_entry(i, ace);
    }
    println!("}}");
}

fn parse_sid(text: &str) -> Sid {
    text.parse().unwrap_or_else(|e| {
        println!("Invalid SID {}: {}", text, e);
        process::exit(1)
    })
}

fn parse_mask(text: &str) -> u32 {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).unwrap_or_else(|_| {
        println!("Invalid access mask {}", text);
        process::exit(1)
    })
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let matches = App::new("Query SD")
        .about("Decodes a binary security descriptor and optionally runs an access check against it")
        .arg(Arg::with_name("file")
            .short("f")
            .long("file")
            .help("Input is a path to a raw descriptor instead of hex text")
            .takes_value(false))
        .arg(Arg::with_name("sddl")
            .short("s")
            .long("sddl")
            .help("Print the descriptor as SDDL")
            .takes_value(false))
        .arg(Arg::with_name("user")
            .short("u")
            .long("user")
            .help("User SID to run an access check for")
            .takes_value(true))
        .arg(Arg::with_name("group")
            .short("g")
            .long("group")
            .help("Group SID held by the user")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1))
        .arg(Arg::with_name("access")
            .short("a")
            .long("access")
            .help("Desired access mask in hex")
            .takes_value(true)
            .default_value("0x80000000"))
        .arg(Arg::with_name("config")
            .short("c")
            .long("config")
            .help("TOML file with access check options")
            .takes_value(true))
        .arg(Arg::with_name("input")
            .help("Hex-encoded descriptor, or a path with --file")
            .required(true)
            .index(1))
        .get_matches();

    let input = matches.value_of("input").unwrap();
    let bytes = if matches.is_present("file") {
        fs::read(input).unwrap_or_else(|e| {
            println!("Failed to read {}: {}", input, e);
            process::exit(1)
        })
    } else {
        hex::decode(input.trim()).unwrap_or_else(|e| {
            println!("Input is not valid hex: {}", e);
            process::exit(1)
        })
    };

    let sd = SecurityDescriptor::decode(&bytes).unwrap_or_else(|e| {
        println!("Failed to parse security descriptor: {}", e);
        process::exit(1)
    });

    if matches.is_present("sddl") {
        println!("{}", sd.to_sddl());
    } else {
        println!("Owner={}", sd.owner.as_ref().map_or_else(|| "None".to_string(), Sid::resolve));
        println!("Group={}", sd.group.as_ref().map_or_else(|| "None".to_string(), Sid::resolve));
        process_acl("DACL", &sd.dacl);
        if let Some(sacl) = &sd.sacl {
            process_acl("SACL", sacl);
        }
    }

    let user = match matches.value_of("user") {
        Some(user) => parse_sid(user),
        None => return,
    };
    let groups = matches
        .values_of("group")
        .map(|values| values.map(parse_sid).collect())
        .unwrap_or_default();
    let desired = parse_mask(matches.value_of("access").unwrap());

    let mut options = match matches.value_of("config") {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| AccessCheckOptions::from_toml(&text).map_err(|e| e.to_string()))
            .unwrap_or_else(|e| {
                println!("Failed to load options from {}: {}", path, e);
                process::exit(1)
            }),
        None => AccessCheckOptions::default(),
    };
    if let Some((level, policy)) = sd.mandatory_label() {
        if options.check_integrity {
            options.object_integrity = level;
            options.integrity_policy = policy;
        }
    }

    let result = access_check(&sd, &AccessToken::new(user, groups), desired, &options);
    println!();
    for detail in &result.details {
        println!("  {}", detail);
    }
    println!(
        "{}: {} (granted access {})",
        if result.granted { "GRANTED" } else { "DENIED" },
        result.reason,
        result.access
    );
}
