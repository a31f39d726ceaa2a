//! Integration tests for the template pipeline.

use std::path::PathBuf;

use serde_json::{json, Value};
use stackpack_assets::ImageAsset;
use stackpack_template::{
    load_template, render_template, write_template, PipelineOptions, TemplatePipeline,
};
use tempfile::tempdir;

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-west-2";
const CODE_KEY: &str = "abababababababababababababababababababababababababababababababab.zip";
const IMAGE_TAG: &str = "5d1e0c3f2a9b8c7d6e5f4a3b2c1d0e9f8a7b6c5d4e3f2a1b0c9d8e7f6a5b4c3d";

/// Account id five times, region three times, one of them as a zone.
fn worked_example() -> Value {
    json!({
        "Parameters": {
            "BootstrapVersion": {"Type": "AWS::SSM::Parameter::Value<String>", "Default": "/cdk-bootstrap/hnb659fds/version"},
            "Stage": {"Type": "String", "Default": "prod"}
        },
        "Resources": {
            "Handler": {
                "Type": "AWS::Lambda::Function",
                "Properties": {
                    "Code": {
                        "S3Bucket": {"Fn::Sub": "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}"},
                        "S3Key": CODE_KEY
                    },
                    "Role": "arn:aws:iam::123456789012:role/handler-role",
                    "Environment": {"Variables": {
                        "TABLE_ARN": "arn:aws:dynamodb:us-west-2:123456789012:table/orders"
                    }}
                },
                "Metadata": {"aws:cdk:path": "ApiStack/Handler/Resource"}
            },
            "Subnet": {
                "Type": "AWS::EC2::Subnet",
                "Properties": {"AvailabilityZone": "us-west-2a", "VpcId": "vpc-0abc"}
            },
            "Topic": {
                "Type": "AWS::SNS::Topic",
                "Properties": {"TopicName": {"Fn::Join": ["-", ["alerts", "123456789012"]]}}
            },
            "Policy": {
                "Type": "AWS::IAM::Policy",
                "Properties": {"PolicyDocument": {"Statement": [{
                    "Action": "sqs:SendMessage",
                    "Effect": "Allow",
                    "Resource": "arn:aws:sqs:us-west-2:123456789012:queue"
                }]}}
            },
            "CDKMetadata": {"Type": "AWS::CDK::Metadata", "Properties": {"Analytics": "v2:deflate64:abc"}}
        },
        "Outputs": {
            "Account": {"Value": "123456789012"}
        },
        "Conditions": {"CDKMetadataAvailable": {"Fn::Equals": ["a", "a"]}},
        "Rules": {"CheckBootstrapVersion": {"Assertions": []}}
    })
}

fn image() -> ImageAsset {
    ImageAsset {
        asset_id: "load-generator".to_string(),
        image_tag: IMAGE_TAG.to_string(),
        tarball_name: format!("{}.tar", IMAGE_TAG),
        repository_name: Some("cdk-hnb659fds-container-assets-123456789012-us-west-2".to_string()),
        source_tarball: PathBuf::from("cdk.out/asset.dead.tar"),
    }
}

/// Every string found in a `Fn::Join` parts list.
fn join_part_strings(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "Fn::Join" {
                    if let Some(parts) = child.get(1).and_then(Value::as_array) {
                        found.extend(parts.iter().filter_map(Value::as_str).map(String::from));
                    }
                }
                join_part_strings(child, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| join_part_strings(item, found)),
        _ => {}
    }
}

#[test]
fn test_worked_example_has_no_literals_left() {
    let input = worked_example();
    let serialized = input.to_string();
    assert_eq!(serialized.matches(ACCOUNT).count(), 5);
    assert_eq!(serialized.matches(REGION).count(), 3);

    let outcome = TemplatePipeline::default().run(input, "ApiStack", &[]);
    let detected = outcome.detected.clone().expect("literals detected");
    assert_eq!(detected.account_id, ACCOUNT);
    assert_eq!(detected.region, REGION);

    let output = render_template(&outcome.template).unwrap();
    assert_eq!(output.matches(ACCOUNT).count(), 0);
    assert_eq!(output.matches(REGION).count(), 0);
    assert_eq!(output.matches("Fn::Select").count(), 1);

    let template = &outcome.template;
    assert_eq!(
        template["Resources"]["Subnet"]["Properties"]["AvailabilityZone"],
        json!({"Fn::Select": [0, {"Fn::GetAZs": {"Ref": "AWS::Region"}}]})
    );
    assert_eq!(template["Parameters"]["Stage"], json!({"Type": "String", "Default": "prod"}));
    assert_eq!(template["Outputs"]["Account"]["Value"], json!({"Ref": "AWS::AccountId"}));
    assert_eq!(
        template["Resources"]["Handler"]["Properties"]["Role"],
        json!({"Fn::Sub": "arn:aws:iam::${AWS::AccountId}:role/handler-role"})
    );
    assert_eq!(
        template["Resources"]["Topic"]["Properties"]["TopicName"],
        json!({"Fn::Join": ["-", ["alerts", {"Ref": "AWS::AccountId"}]]})
    );
}

#[test]
fn test_build_content_removed() {
    let outcome = TemplatePipeline::default().run(worked_example(), "ApiStack", &[]);
    let template = outcome.template.as_object().unwrap();

    assert!(!template.contains_key("Rules"));
    assert!(!template["Parameters"].as_object().unwrap().contains_key("BootstrapVersion"));
    assert!(!template["Resources"].as_object().unwrap().contains_key("CDKMetadata"));
    assert!(template["Resources"]["Handler"].get("Metadata").is_none());
    assert!(!template["Conditions"]
        .as_object()
        .unwrap()
        .contains_key("CDKMetadataAvailable"));
}

#[test]
fn test_code_reference_keeps_hash_key() {
    let outcome = TemplatePipeline::default().run(worked_example(), "ApiStack", &[]);
    let code = &outcome.template["Resources"]["Handler"]["Properties"]["Code"];

    assert_eq!(code["S3Bucket"], json!({"Ref": "AssetBucket"}));
    assert_eq!(
        code["S3Key"],
        json!({"Fn::Sub": [format!("${{Prefix}}{}", CODE_KEY), {"Prefix": {"Ref": "AssetPrefix"}}]})
    );
}

#[test]
fn test_parameter_completeness() {
    let pipeline = TemplatePipeline::default();

    let api = pipeline.run(worked_example(), "ApiStack", &[]);
    let parameters = api.template["Parameters"].as_object().unwrap();
    assert!(parameters.contains_key("AssetBucket"));
    assert!(parameters.contains_key("AssetPrefix"));
    assert!(!parameters.contains_key("Language"));

    let services = pipeline.run(worked_example(), "powertoolsworkshopservices", &[]);
    let language = &services.template["Parameters"]["Language"];
    assert_eq!(language["Default"], "typescript");
    assert_eq!(
        language["AllowedValues"],
        json!(["typescript", "python", "java", "dotnet"])
    );
}

#[test]
fn test_join_parts_have_no_placeholders() {
    let mut input = worked_example();
    input["Outputs"]["Console"] = json!({"Value": {"Fn::Join": ["", [
        "https://${AWS::Region}.console.aws.amazon.com/",
        {"Ref": "Topic"}
    ]]}});
    input["Resources"]["Bucket"] = json!({
        "Type": "AWS::S3::Bucket",
        "Properties": {"BucketName": {"Fn::Join": ["", ["logs-", "us-west-2", "-123456789012"]]}}
    });

    let outcome = TemplatePipeline::default().run(input, "ApiStack", &[]);

    let mut parts = Vec::new();
    join_part_strings(&outcome.template, &mut parts);
    assert!(!parts.is_empty());
    assert!(parts.iter().all(|part| !part.contains("${AWS::")), "{:?}", parts);
    assert_eq!(
        outcome.template["Resources"]["Bucket"]["Properties"]["BucketName"],
        json!({"Fn::Join": ["", [
            "logs-",
            {"Ref": "AWS::Region"},
            "-",
            {"Ref": "AWS::AccountId"}
        ]]})
    );
}

#[test]
fn test_container_images_use_synthesized_repository() {
    let mut input = worked_example();
    input["Resources"]["LoadTask"] = json!({
        "Type": "AWS::ECS::TaskDefinition",
        "Properties": {"ContainerDefinitions": [{
            "Name": "load",
            "Image": {"Fn::Sub": format!(
                "123456789012.dkr.ecr.us-west-2.${{AWS::URLSuffix}}/cdk-hnb659fds-container-assets-123456789012-us-west-2:{}",
                IMAGE_TAG
            )}
        }]}
    });

    let outcome = TemplatePipeline::new(PipelineOptions::default()).run(input, "ApiStack", &[image()]);

    assert_eq!(outcome.containers.containers, 1);
    assert_eq!(
        outcome.template["Resources"]["LoadTask"]["Properties"]["ContainerDefinitions"][0]["Image"],
        json!({"Fn::Sub": "${AWS::AccountId}.dkr.ecr.${AWS::Region}.${AWS::URLSuffix}/${LoadGeneratorECRRepository}:latest"})
    );
    assert_eq!(
        outcome.template["Parameters"]["DockerImageTarballKey"]["Default"],
        format!("{}.tar", IMAGE_TAG)
    );
    assert!(outcome.template["Outputs"]["LoadGeneratorECRRepositoryUri"].is_object());

    let output = render_template(&outcome.template).unwrap();
    assert_eq!(output.matches(ACCOUNT).count(), 0);
}

#[test]
fn test_asset_hash_strings_survive_byte_identical() {
    let hash_with_account = format!("{}{}.tar", ACCOUNT, "0".repeat(52));
    let mut input = worked_example();
    input["Resources"]["Build"] = json!({
        "Type": "AWS::SSM::Parameter",
        "Properties": {"Value": hash_with_account}
    });

    let outcome = TemplatePipeline::default().run(input, "ApiStack", &[]);
    assert_eq!(
        outcome.template["Resources"]["Build"]["Properties"]["Value"],
        Value::String(hash_with_account)
    );
}

#[tokio::test]
async fn test_repeated_runs_write_identical_templates() {
    let temp = tempdir().unwrap();
    let input_path = temp.path().join("cdk.out/ApiStack.template.json");
    let output_path = temp.path().join("cfn/ApiStack.json");
    write_template(&worked_example(), &input_path).await.unwrap();

    let pipeline = TemplatePipeline::default();
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let template = load_template(&input_path).await.unwrap();
        let outcome = pipeline.run(template, "ApiStack", &[image()]);
        write_template(&outcome.template, &output_path).await.unwrap();
        outputs.push(std::fs::read(&output_path).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_template_without_account_is_emitted_sanitized() {
    let input = json!({
        "Resources": {"Queue": {
            "Type": "AWS::SQS::Queue",
            "Properties": {"QueueName": "orders-us-west-2"},
            "Metadata": {"aws:cdk:path": "ApiStack/Queue"}
        }},
        "Rules": {}
    });

    let outcome = TemplatePipeline::default().run(input, "ApiStack", &[]);

    assert!(outcome.detected.is_none());
    assert!(outcome.template.get("Rules").is_none());
    assert!(outcome.template["Resources"]["Queue"].get("Metadata").is_none());
    assert_eq!(
        outcome.template["Resources"]["Queue"]["Properties"]["QueueName"],
        "orders-us-west-2"
    );
    assert!(outcome.template["Parameters"]["AssetBucket"].is_object());
}

#[test]
fn test_unrelated_numbers_are_not_rewritten() {
    let input = json!({
        "Resources": {
            "Queue": {
                "Type": "AWS::SQS::Queue",
                "Properties": {
                    "RedrivePolicy": {"deadLetterTargetArn": "arn:aws:sqs:us-west-2:123456789012:dlq"},
                    "Description": "capacity 1234567890123",
                    "Owner": 123456789012u64
                }
            },
            "Topic": {
                "Type": "AWS::SNS::Topic",
                "Properties": {"TopicName": "alerts-123456789012"}
            }
        }
    });

    let outcome = TemplatePipeline::default().run(input, "QueueStack", &[]);
    let properties = &outcome.template["Resources"]["Queue"]["Properties"];

    assert_eq!(properties["Description"], json!("capacity 1234567890123"));
    assert_eq!(properties["Owner"], json!({"Ref": "AWS::AccountId"}));

    // the only remaining match is the prefix of the capacity figure
    let rendered = render_template(&outcome.template).unwrap();
    assert_eq!(rendered.matches(ACCOUNT).count(), 1);
    assert!(rendered.contains("1234567890123"));
}
