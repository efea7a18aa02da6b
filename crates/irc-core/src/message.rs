use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Server(String),
    User {
        nick: String,
        user: String,
        host: String,
    },
}

impl Origin {
    pub fn parse(prefix: &str) -> Self {
        let prefix = prefix.strip_prefix(':').unwrap_or(prefix);
        let bang = prefix.find('!');
        let at = prefix.find('@');
        if bang.is_none() && at.is_none() {
            return Origin::Server(prefix.to_string());
        }

        let nick_end = match (bang, at) {
            (Some(b), Some(a)) => b.min(a),
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => prefix.len(),
        };
        let user = match bang {
            Some(b) => {
                let rest = &prefix[b + 1..];
                match rest.find('@') {
                    Some(a) => &rest[..a],
                    None => rest,
                }
            }
            None => "",
        };
        let host = at.map(|a| &prefix[a + 1..]).unwrap_or("");

        Origin::User {
            nick: prefix[..nick_end].to_string(),
            user: user.to_string(),
            host: host.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Origin::Server(name) => name,
            Origin::User { nick, .. } => nick,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub origin: Option<Origin>,
    pub command: String,
    pub args: Vec<String>,
    pub raw: String,
}

impl Message {
    pub fn nick(&self) -> Option<&str> {
        match &self.origin {
            Some(Origin::User { nick, .. }) => Some(nick),
            _ => None,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn trailing(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or("")
    }

    pub fn ctcp(&self) -> Option<(&str, &str)> {
        let body = self
            .trailing()
            .strip_prefix('\x01')?
            .strip_suffix('\x01')?;
        Some(tear(body, " "))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn decode(line: &str) -> Message {
    let raw = line.trim_end_matches(['\r', '\n']);
    let mut rest = raw;

    let mut origin = None;
    if rest.starts_with(':') {
        let (prefix, after) = tear(rest, " ");
        origin = Some(Origin::parse(prefix));
        rest = after;
    }

    let (head, trailing) = match rest.find(" :") {
        Some(i) => (&rest[..i], Some(&rest[i + 2..])),
        None => (rest, None),
    };

    let (command, mut middle) = tear(head, " ");
    let mut args = Vec::new();
    while !middle.is_empty() {
        let (arg, next) = tear(middle, " ");
        args.push(arg.to_string());
        middle = next;
    }
    if let Some(trailing) = trailing {
        args.push(trailing.to_string());
    }

    Message {
        origin,
        command: command.to_ascii_uppercase(),
        args,
        raw: raw.to_string(),
    }
}

/// Serializes without the CRLF terminator. The last argument is always sent
/// as a trailing parameter.
pub fn encode<S: AsRef<str>>(command: &str, args: &[S]) -> String {
    let mut out = String::from(command);
    if let Some((last, middle)) = args.split_last() {
        for arg in middle {
            out.push(' ');
            out.push_str(arg.as_ref());
        }
        out.push_str(" :");
        out.push_str(last.as_ref());
    }
    out
}

fn tear<'a>(s: &'a str, sep: &str) -> (&'a str, &'a str) {
    match s.find(sep) {
        Some(i) => (&s[..i], &s[i + sep.len()..]),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_privmsg_with_trailing() {
        let msg = decode("PRIVMSG #chan :hello world");
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.args, vec!["#chan", "hello world"]);
        assert!(msg.origin.is_none());
    }

    #[test]
    fn decode_user_prefix() {
        let msg = decode(":nick!user@host PRIVMSG #chan :hi");
        assert_eq!(
            msg.origin,
            Some(Origin::User {
                nick: "nick".into(),
                user: "user".into(),
                host: "host".into(),
            })
        );
        assert_eq!(msg.nick(), Some("nick"));
        assert_eq!(msg.args, vec!["#chan", "hi"]);
    }

    #[test]
    fn decode_ping() {
        let msg = decode("PING :irc.example.org");
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.args, vec!["irc.example.org"]);
        assert!(msg.origin.is_none());
    }

    #[test]
    fn decode_server_prefix_and_numeric() {
        let msg = decode(":irc.example.org 001 bot :Welcome to the network\r\n");
        assert_eq!(msg.origin, Some(Origin::Server("irc.example.org".into())));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.args, vec!["bot", "Welcome to the network"]);
        assert_eq!(msg.raw, ":irc.example.org 001 bot :Welcome to the network");
    }

    #[test]
    fn decode_partial_prefixes() {
        assert_eq!(
            Origin::parse("nick@host"),
            Origin::User {
                nick: "nick".into(),
                user: String::new(),
                host: "host".into(),
            }
        );
        assert_eq!(
            Origin::parse(":nick!user"),
            Origin::User {
                nick: "nick".into(),
                user: "user".into(),
                host: String::new(),
            }
        );
    }

    #[test]
    fn decode_lowercases_are_canonicalized() {
        assert_eq!(decode("privmsg #c :x").command, "PRIVMSG");
    }

    #[test]
    fn decode_without_command_is_empty() {
        assert_eq!(decode("").command, "");
        let msg = decode(":lonely.prefix");
        assert_eq!(msg.command, "");
        assert!(msg.args.is_empty());
        assert_eq!(decode(" :only trailing").command, "");
    }

    #[test]
    fn decode_keeps_empty_trailing() {
        let msg = decode("TOPIC #chan :");
        assert_eq!(msg.args, vec!["#chan", ""]);
    }

    #[test]
    fn encode_forms() {
        assert_eq!(encode::<&str>("QUIT", &[]), "QUIT");
        assert_eq!(encode("NICK", &["bot"]), "NICK :bot");
        assert_eq!(
            encode("USER", &["bot", "0", "*", "Real Name"]),
            "USER bot 0 * :Real Name"
        );
    }

    #[test]
    fn round_trip_is_stable() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("PRIVMSG", vec!["#chan", "hello there"]),
            ("JOIN", vec!["#a"]),
            ("MODE", vec!["#a", "+o", "nick"]),
            ("TOPIC", vec!["#a", ""]),
            ("PRIVMSG", vec!["#a", ":leading colon"]),
            ("AWAY", vec![]),
        ];
        for (command, args) in cases {
            let msg = decode(&encode(command, &args));
            assert_eq!(msg.command, command);
            assert_eq!(msg.args, args);
        }
    }

    #[test]
    fn ctcp_action() {
        let msg = decode(":a!b@c PRIVMSG #chan :\x01ACTION waves hello\x01");
        assert_eq!(msg.ctcp(), Some(("ACTION", "waves hello")));
        assert_eq!(decode("PRIVMSG #chan :plain").ctcp(), None);
    }
}
