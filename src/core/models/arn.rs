/// The fields of an Amazon Resource Name.
///
/// `arn:partition:service:region:account-id:resource`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account_id: &'a str,
    pub resource: &'a str,
}

impl<'a> Arn<'a> {
    /// Split an ARN into its fields. Returns `None` for anything that is
    /// not shaped like an ARN. The resource part may itself contain `:`.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let partition = parts.next()?;
        let service = parts.next()?;
        let region = parts.next()?;
        let account_id = parts.next()?;
        let resource = parts.next()?;
        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return None;
        }
        Some(Self {
            partition,
            service,
            region,
            account_id,
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_certificate_arn() {
        let arn = Arn::parse(
            "arn:aws:acm:us-west-2:123456789012:certificate/0f1e2d3c-aaaa-bbbb-cccc-111122223333",
        )
        .unwrap();

        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "acm");
        assert_eq!(arn.region, "us-west-2");
        assert_eq!(arn.account_id, "123456789012");
        assert!(arn.resource.starts_with("certificate/"));
    }

    #[test]
    fn resource_may_contain_colons() {
        let arn = Arn::parse("arn:aws:logs:eu-west-1:1:log-group:/ecs/app:*").unwrap();
        assert_eq!(arn.resource, "log-group:/ecs/app:*");
    }

    #[test]
    fn rejects_non_arns() {
        assert!(Arn::parse("not-an-arn").is_none());
        assert!(Arn::parse("arn:aws:acm").is_none());
        assert!(Arn::parse("urn:aws:acm:us-east-1:1:certificate/x").is_none());
    }
}
